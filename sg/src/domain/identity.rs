//! Identity key and the tri-state identity value

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key of the authenticated principal
///
/// Supplied exclusively by the identity provider. Comparison is the only
/// operation the coordinator performs on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for IdentityKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Who the coordinator currently believes is signed in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "key", rename_all = "kebab-case")]
pub enum IdentityState {
    /// Not yet determined (startup, before the provider answered)
    #[default]
    Unknown,
    /// Determined to be signed out
    Anonymous,
    /// Signed in as the given key
    Known(IdentityKey),
}

impl IdentityState {
    pub fn key(&self) -> Option<&IdentityKey> {
        match self {
            Self::Known(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// True when the state already reflects the given provider value
    pub fn matches(&self, identity: Option<&IdentityKey>) -> bool {
        match (self, identity) {
            (Self::Known(current), Some(incoming)) => current == incoming,
            (Self::Anonymous, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Anonymous => f.write_str("anonymous"),
            Self::Known(key) => write!(f, "{}", key),
        }
    }
}
