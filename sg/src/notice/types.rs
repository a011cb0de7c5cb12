//! Notice and reason-code types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the coordinator forced a session back to signed-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryReason {
    /// Identity resolved but no usable profile record exists
    ProfileMissing,
    /// Profile exists but fails the acceptance predicate (admin role gate)
    AccessDenied,
    /// The identity provider itself failed
    ChannelError,
}

impl RecoveryReason {
    /// Wire form of the reason code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProfileMissing => "profile_missing",
            Self::AccessDenied => "access_denied",
            Self::ChannelError => "channel_error",
        }
    }
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A notice raised by one coordinator scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionNotice {
    /// Session was forced back to signed-out
    Recovered { scope: String, reason: RecoveryReason },
    /// Profile fetch failed; recovery timer handles the rest
    ProfileFetchFailed { scope: String, message: String },
    /// A dependent resource failed; readiness is not blocked
    ResourceFetchFailed {
        scope: String,
        resource: String,
        message: String,
    },
}

impl SessionNotice {
    pub fn scope(&self) -> &str {
        match self {
            Self::Recovered { scope, .. }
            | Self::ProfileFetchFailed { scope, .. }
            | Self::ResourceFetchFailed { scope, .. } => scope,
        }
    }

    /// Reason code for recovery notices
    pub fn reason(&self) -> Option<RecoveryReason> {
        match self {
            Self::Recovered { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
