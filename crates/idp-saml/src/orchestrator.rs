//! Login response orchestration.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use idp_core::{Binding, ConfigRegistry, ServiceProvider, UserProfile};
use uuid::Uuid;

use crate::constants::{name_id_formats, AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT};
use crate::document::LoginResponseParams;
use crate::error::SamlResult;
use crate::toolkit::{ResponseDocument, SamlToolkit};

/// Clock skew tolerated before the issue instant, in minutes.
const NOT_BEFORE_SKEW_MINUTES: i64 = 2;

/// Lifetime of the assertion and of its bearer confirmation, in minutes.
const VALIDITY_MINUTES: i64 = 5;

/// Turns an authenticated profile into a signed response for one SP.
#[derive(Clone)]
pub struct ResponseOrchestrator {
    registry: Arc<ConfigRegistry>,
    toolkit: Arc<dyn SamlToolkit>,
}

impl ResponseOrchestrator {
    /// Creates an orchestrator.
    pub fn new(registry: Arc<ConfigRegistry>, toolkit: Arc<dyn SamlToolkit>) -> Self {
        Self { registry, toolkit }
    }

    /// Returns the toolkit.
    #[must_use]
    pub fn toolkit(&self) -> &Arc<dyn SamlToolkit> {
        &self.toolkit
    }

    /// Builds the signed response for `profile` at the current time.
    pub fn build_response(
        &self,
        sp: &ServiceProvider,
        binding: Binding,
        profile: &UserProfile,
        relay_state: Option<&str>,
    ) -> SamlResult<ResponseDocument> {
        self.build_response_at(sp, binding, profile, relay_state, Utc::now())
    }

    /// Builds the signed response for `profile` as of `now`.
    pub fn build_response_at(
        &self,
        sp: &ServiceProvider,
        binding: Binding,
        profile: &UserProfile,
        relay_state: Option<&str>,
        now: DateTime<Utc>,
    ) -> SamlResult<ResponseDocument> {
        let params = self.login_params(sp, profile, now);
        let document = self
            .toolkit
            .create_login_response(sp, binding, &params, relay_state)?;

        tracing::info!(
            sp = %sp.entity_id(),
            binding = %binding,
            response_id = %document.response_id,
            attributes = params.attributes.len(),
            "Issued SAML response"
        );
        Ok(document)
    }

    /// Computes the response fields for `profile`.
    #[must_use]
    pub fn login_params(
        &self,
        sp: &ServiceProvider,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> LoginResponseParams {
        let name_id_format = sp
            .config()
            .nameid_format
            .clone()
            .unwrap_or_else(|| name_id_formats::EMAIL.to_string());

        let valid_until = now + Duration::minutes(VALIDITY_MINUTES);

        LoginResponseParams {
            name_id: profile.subject_identifier().to_string(),
            name_id_format,
            session_index: Uuid::new_v4().to_string(),
            authn_context_class_ref: AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT.to_string(),
            audience: sp.audience().to_string(),
            recipient: sp.recipient().to_string(),
            issue_instant: now,
            not_before: now - Duration::minutes(NOT_BEFORE_SKEW_MINUTES),
            not_on_or_after: valid_until,
            subject_not_on_or_after: valid_until,
            attributes: self.registry.project_attributes(sp, profile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::registry;
    use crate::toolkit::XmlToolkit;
    use crate::bindings::HttpPostBinding;
    use chrono::TimeZone;

    fn orchestrator() -> ResponseOrchestrator {
        let registry = Arc::new(registry());
        let toolkit = Arc::new(XmlToolkit::new(&registry).unwrap());
        ResponseOrchestrator::new(registry, toolkit)
    }

    fn jdoe() -> UserProfile {
        UserProfile::new("uid=jdoe,dc=example,dc=com", "jdoe")
            .with_email("jdoe@example.com")
            .with_display_name("Jane Doe")
            .with_groups(["eng"])
    }

    #[test]
    fn name_id_prefers_email() {
        let o = orchestrator();
        let sp = o.registry.lookup("sp1").unwrap();
        let now = Utc::now();

        assert_eq!(o.login_params(&sp, &jdoe(), now).name_id, "jdoe@example.com");

        let no_mail = UserProfile::new("uid=bob", "bob");
        assert_eq!(o.login_params(&sp, &no_mail, now).name_id, "bob");
    }

    #[test]
    fn format_audience_and_recipient() {
        let o = orchestrator();
        let now = Utc::now();

        let sp1 = o.registry.lookup("sp1").unwrap();
        let p = o.login_params(&sp1, &jdoe(), now);
        assert_eq!(p.name_id_format, name_id_formats::EMAIL);
        assert_eq!(p.audience, "https://sp1.example.com");
        assert_eq!(p.recipient, "https://sp1.example.com/acs");
        assert_eq!(p.authn_context_class_ref, AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT);

        let sp2 = o.registry.lookup("https://sp2.example.com").unwrap();
        let p = o.login_params(&sp2, &jdoe(), now);
        assert_eq!(p.name_id_format, name_id_formats::PERSISTENT);
        assert_eq!(p.audience, "urn:sp2");
    }

    #[test]
    fn validity_window() {
        let o = orchestrator();
        let sp = o.registry.lookup("sp1").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let p = o.login_params(&sp, &jdoe(), now);
        assert_eq!(p.not_before, Utc.with_ymd_and_hms(2026, 3, 1, 11, 58, 0).unwrap());
        assert_eq!(p.not_on_or_after, Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap());
        assert_eq!(p.subject_not_on_or_after, p.not_on_or_after);
    }

    #[test]
    fn session_index_is_fresh() {
        let o = orchestrator();
        let sp = o.registry.lookup("sp1").unwrap();
        let now = Utc::now();
        assert_ne!(
            o.login_params(&sp, &jdoe(), now).session_index,
            o.login_params(&sp, &jdoe(), now).session_index
        );
    }

    #[test]
    fn attributes_follow_sp_map() {
        let o = orchestrator();
        let sp = o.registry.lookup("sp1").unwrap();
        let p = o.login_params(&sp, &jdoe(), Utc::now());
        assert_eq!(p.attributes.names(), vec!["Email"]);
    }

    #[test]
    fn built_response_carries_profile() {
        let o = orchestrator();
        let sp = o.registry.lookup("sp1").unwrap();

        let doc = o.build_response(&sp, Binding::Post, &jdoe(), Some("relay")).unwrap();
        let encoded = HttpPostBinding::extract_form_value(&doc.body, "SAMLResponse").unwrap();
        let xml = HttpPostBinding::decode(encoded).unwrap();

        assert!(xml.contains(">jdoe@example.com</saml:NameID>"));
        assert!(xml.contains(r#"<saml:Attribute Name="Email""#));
    }
}
