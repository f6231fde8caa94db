//! Per-SP authorization.

use crate::config::ServiceProviderConfig;
use crate::profile::UserProfile;

/// Decides whether `profile` may receive an assertion for `sp`.
///
/// An SP without `allowed_groups` admits every authenticated user. Otherwise
/// the user must belong to at least one of the listed groups.
#[must_use]
pub fn is_authorized(sp: &ServiceProviderConfig, profile: &UserProfile) -> bool {
    sp.allowed_groups.is_empty() || profile.is_member_of_any(&sp.allowed_groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Binding, Endpoint};

    fn sp(allowed: &[&str]) -> ServiceProviderConfig {
        ServiceProviderConfig {
            entity_id: "sp".to_string(),
            acs: vec![Endpoint {
                url: "https://sp/acs".to_string(),
                binding: Binding::Post,
            }],
            slo: Vec::new(),
            allowed_groups: allowed.iter().map(|g| (*g).to_string()).collect(),
            audience: None,
            nameid_format: None,
            want_assertions_signed: true,
            want_message_signed: false,
            key: None,
        }
    }

    const UNIVERSE: [&str; 4] = ["eng", "finance", "ops", "hr"];

    /// Every subset of `UNIVERSE`.
    fn subsets() -> Vec<Vec<&'static str>> {
        (0..(1u32 << UNIVERSE.len()))
            .map(|mask| {
                UNIVERSE
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, g)| *g)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        let sp = sp(&[]);
        for groups in subsets() {
            let profile = UserProfile::new("dn", "u").with_groups(groups);
            assert!(is_authorized(&sp, &profile));
        }
    }

    #[test]
    fn allow_list_requires_intersection() {
        for allowed in subsets().into_iter().filter(|s| !s.is_empty()) {
            let sp = sp(&allowed);
            for groups in subsets() {
                let profile = UserProfile::new("dn", "u").with_groups(groups.clone());
                let expected = groups.iter().any(|g| allowed.contains(g));
                assert_eq!(
                    is_authorized(&sp, &profile),
                    expected,
                    "allowed={allowed:?} groups={groups:?}"
                );
            }
        }
    }

    #[test]
    fn eng_user_denied_for_finance_only_sp() {
        let profile = UserProfile::new("dn", "u").with_groups(["eng"]);
        assert!(!is_authorized(&sp(&["finance"]), &profile));
    }
}
