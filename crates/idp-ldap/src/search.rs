//! Directory entries and their normalization into user profiles.

use std::collections::HashMap;

use idp_core::UserProfile;
use ldap3::SearchEntry;

use crate::config::LdapSettings;

/// Represents an LDAP entry with parsed attributes.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Creates a new LDAP entry from search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }

    /// Creates an entry by hand.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds attribute values.
    #[must_use]
    pub fn with_attr<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Gets all values of an attribute. Attribute names are case-insensitive.
    #[must_use]
    pub fn get_attrs(&self, name: &str) -> Option<&Vec<String>> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Gets the first non-empty value of an attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attrs(name)
            .and_then(|v| v.iter().find(|s| !s.is_empty()))
            .map(String::as_str)
    }

    /// Normalizes the entry into a [`UserProfile`].
    ///
    /// - groups become a set whether the directory returned one value or many
    /// - the username falls back to the login name that was searched for
    /// - the display name falls back from `displayName` to `cn` to
    ///   `givenName sn`
    #[must_use]
    pub fn into_profile(self, settings: &LdapSettings, login: &str) -> UserProfile {
        let username = self
            .get_attr(&settings.username_attribute)
            .unwrap_or(login)
            .to_string();

        let given_name = self.get_attr("givenName").map(String::from);
        let surname = self.get_attr("sn").map(String::from);

        let display_name = self
            .get_attr("displayName")
            .or_else(|| self.get_attr("cn"))
            .map(String::from)
            .or_else(|| {
                let joined = format!(
                    "{} {}",
                    given_name.as_deref().unwrap_or(""),
                    surname.as_deref().unwrap_or("")
                );
                let joined = joined.trim();
                (!joined.is_empty()).then(|| joined.to_string())
            });

        let groups: Vec<String> = self
            .get_attrs(&settings.group_attribute)
            .map(|v| v.iter().filter(|g| !g.is_empty()).cloned().collect())
            .unwrap_or_default();

        UserProfile {
            email: self.get_attr("mail").map(String::from),
            display_name,
            given_name,
            surname,
            groups: groups.into_iter().collect(),
            username,
            dn: self.dn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LdapSettings {
        LdapSettings::builder()
            .url("ldaps://ldap.example.com")
            .bind_dn("cn=admin,dc=example,dc=com")
            .bind_password("secret")
            .base_dn("dc=example,dc=com")
            .build()
            .unwrap()
    }

    #[test]
    fn full_entry_normalization() {
        let entry = LdapEntry::new("uid=jdoe,ou=people,dc=example,dc=com")
            .with_attr("uid", ["jdoe"])
            .with_attr("mail", ["jdoe@example.com"])
            .with_attr("displayName", ["Jane Doe"])
            .with_attr("cn", ["J. Doe"])
            .with_attr("givenName", ["Jane"])
            .with_attr("sn", ["Doe"])
            .with_attr("memberOf", ["cn=eng,ou=groups", "cn=ops,ou=groups"]);

        let profile = entry.into_profile(&settings(), "JDOE");
        assert_eq!(profile.dn, "uid=jdoe,ou=people,dc=example,dc=com");
        assert_eq!(profile.username, "jdoe");
        assert_eq!(profile.email.as_deref(), Some("jdoe@example.com"));
        assert_eq!(profile.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.groups.len(), 2);
        assert!(profile.groups.contains("cn=eng,ou=groups"));
    }

    #[test]
    fn single_group_becomes_set() {
        let entry = LdapEntry::new("uid=a,dc=example").with_attr("memberOf", ["cn=eng"]);
        let profile = entry.into_profile(&settings(), "a");
        assert_eq!(profile.groups.into_iter().collect::<Vec<_>>(), vec!["cn=eng"]);
    }

    #[test]
    fn missing_groups_is_empty_set() {
        let profile = LdapEntry::new("uid=a,dc=example").into_profile(&settings(), "a");
        assert!(profile.groups.is_empty());
        assert_eq!(profile.username, "a");
    }

    #[test]
    fn display_name_falls_back_to_cn() {
        let entry = LdapEntry::new("uid=a").with_attr("cn", ["Alice A"]);
        let profile = entry.into_profile(&settings(), "a");
        assert_eq!(profile.display_name.as_deref(), Some("Alice A"));
    }

    #[test]
    fn display_name_falls_back_to_given_and_surname() {
        let entry = LdapEntry::new("uid=a")
            .with_attr("givenName", ["Alice"])
            .with_attr("sn", ["Smith"]);
        let profile = entry.into_profile(&settings(), "a");
        assert_eq!(profile.display_name.as_deref(), Some("Alice Smith"));

        let entry = LdapEntry::new("uid=a").with_attr("sn", ["Smith"]);
        let profile = entry.into_profile(&settings(), "a");
        assert_eq!(profile.display_name.as_deref(), Some("Smith"));

        let profile = LdapEntry::new("uid=a").into_profile(&settings(), "a");
        assert_eq!(profile.display_name, None);
    }

    #[test]
    fn attribute_lookup_is_case_insensitive() {
        let entry = LdapEntry::new("uid=a").with_attr("memberof", ["cn=eng"]);
        assert!(entry.get_attrs("memberOf").is_some());
    }
}
