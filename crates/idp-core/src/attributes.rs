//! Attribute projection.
//!
//! Each service provider may reference an attribute map by key. A map is an
//! ordered list of `(profile field, assertion attribute name)` pairs that is
//! validated when the configuration is loaded. Service providers without a
//! map receive the default attribute set.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::profile::UserProfile;

/// Profile fields that can be released as assertion attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    /// Email address.
    Email,
    /// Display name.
    DisplayName,
    /// Given name.
    GivenName,
    /// Surname.
    Sn,
    /// Group memberships.
    Groups,
    /// Username.
    Uid,
}

impl ProfileField {
    /// The default attribute set, in release order.
    pub const DEFAULTS: [Self; 6] = [
        Self::Email,
        Self::DisplayName,
        Self::GivenName,
        Self::Sn,
        Self::Groups,
        Self::Uid,
    ];

    /// Attribute name used in the default set.
    #[must_use]
    pub const fn default_name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::DisplayName => "displayName",
            Self::GivenName => "givenName",
            Self::Sn => "sn",
            Self::Groups => "groups",
            Self::Uid => "uid",
        }
    }

    /// Parses a local field name from an attribute map.
    ///
    /// `mail` and `username` are accepted as the directory spellings of
    /// `email` and `uid`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email" | "mail" => Some(Self::Email),
            "displayName" => Some(Self::DisplayName),
            "givenName" => Some(Self::GivenName),
            "sn" => Some(Self::Sn),
            "groups" => Some(Self::Groups),
            "uid" | "username" => Some(Self::Uid),
            _ => None,
        }
    }

    /// Reads the field from a profile. Absent and empty values yield `None`.
    #[must_use]
    pub fn value(&self, profile: &UserProfile) -> Option<AttributeValue> {
        let single = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| AttributeValue::Single(s.to_string()))
        };
        match self {
            Self::Email => single(&profile.email),
            Self::DisplayName => single(&profile.display_name),
            Self::GivenName => single(&profile.given_name),
            Self::Sn => single(&profile.surname),
            Self::Groups if profile.groups.is_empty() => None,
            Self::Groups => Some(AttributeValue::Multi(
                profile.groups.iter().cloned().collect(),
            )),
            Self::Uid if profile.username.is_empty() => None,
            Self::Uid => Some(AttributeValue::Single(profile.username.clone())),
        }
    }

    /// Empty value of the right arity, used by the default set.
    fn empty_value(&self) -> AttributeValue {
        match self {
            Self::Groups => AttributeValue::Multi(Vec::new()),
            _ => AttributeValue::Single(String::new()),
        }
    }
}

/// A released attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Single-valued attribute.
    Single(String),
    /// Multi-valued attribute.
    Multi(Vec<String>),
}

impl AttributeValue {
    /// Returns the values as a slice-like list.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Ordered, validated attribute map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMapping {
    entries: Vec<(ProfileField, String)>,
}

impl AttributeMapping {
    /// Builds a mapping from `(local field, attribute name)` pairs.
    ///
    /// Returns the first unknown local field name as the error.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = Vec::new();
        for (local, target) in pairs {
            let field =
                ProfileField::from_name(local.as_ref()).ok_or_else(|| local.as_ref().to_string())?;
            entries.push((field, target.into()));
        }
        Ok(Self { entries })
    }

    pub(crate) fn from_yaml(
        map: &str,
        mapping: &serde_yaml::Mapping,
        location: &str,
    ) -> ConfigResult<Self> {
        let mut pairs = Vec::with_capacity(mapping.len());
        for (local, target) in mapping {
            match (local.as_str(), target.as_str()) {
                (Some(local), Some(target)) => pairs.push((local, target)),
                _ => {
                    return Err(ConfigError::InvalidAttributeEntry {
                        location: location.to_string(),
                        map: map.to_string(),
                    })
                }
            }
        }
        Self::from_pairs(pairs).map_err(|field| ConfigError::UnknownAttributeField {
            location: location.to_string(),
            map: map.to_string(),
            field,
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.entries.iter().map(|(f, t)| (*f, t.as_str()))
    }
}

/// Attributes released to one service provider, in release order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedAttributes {
    entries: Vec<(String, AttributeValue)>,
}

impl ProjectedAttributes {
    fn push(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.entries.push((name.into(), value));
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of released attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is released.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attribute names in release order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Projects profiles onto per-SP attribute sets.
#[derive(Debug, Clone, Default)]
pub struct AttributeProjector {
    maps: HashMap<String, AttributeMapping>,
}

impl AttributeProjector {
    /// Creates a projector over validated attribute maps.
    #[must_use]
    pub fn new(maps: HashMap<String, AttributeMapping>) -> Self {
        Self { maps }
    }

    /// Projects `profile` for the attribute map `key`.
    ///
    /// Without a map for `key` the six default attributes are always released,
    /// empty where the profile has no value. With a map, only entries whose
    /// profile value is present are released.
    #[must_use]
    pub fn project(&self, key: Option<&str>, profile: &UserProfile) -> ProjectedAttributes {
        let mut out = ProjectedAttributes::default();

        match key.and_then(|k| self.maps.get(k)) {
            None => {
                for field in ProfileField::DEFAULTS {
                    let value = field.value(profile).unwrap_or_else(|| field.empty_value());
                    out.push(field.default_name(), value);
                }
            }
            Some(mapping) => {
                for (field, target) in mapping.iter() {
                    if let Some(value) = field.value(profile) {
                        out.push(target, value);
                    }
                }
            }
        }

        out
    }
}
