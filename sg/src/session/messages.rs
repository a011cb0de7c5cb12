//! Message types for the session coordinator

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Generation, IdentityKey};
use crate::provider::{ChannelError, Credentials, FetchError};

/// Errors returned to callers of the action surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Login failed: {0}")]
    Login(ChannelError),

    #[error("Logout failed: {0}")]
    Logout(ChannelError),

    #[error("Session coordinator stopped")]
    Stopped,
}

/// Internal requests to the coordinator task
///
/// Provider callbacks, fetch completions and timer firings all arrive here,
/// so every transition runs on the coordinator task in arrival order.
#[derive(Debug)]
pub enum SessionRequest<P> {
    /// Identity channel reported a value (startup read or push event)
    IdentityChanged { identity: Option<IdentityKey> },

    /// Identity channel failed
    ChannelFailed { message: String },

    /// Profile fetch completed
    ProfileFetched {
        generation: Generation,
        result: Result<Option<P>, FetchError>,
    },

    /// Dependent resource fetch completed
    ResourceFetched {
        generation: Generation,
        name: String,
        result: Result<serde_json::Value, FetchError>,
    },

    /// Orphan recovery timer elapsed (internal)
    OrphanTimerFired { generation: Generation },

    /// Consumer asked to sign in
    Login {
        credentials: Credentials,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Identity read after a successful login (internal)
    LoginIdentity {
        generation: Generation,
        identity: Option<IdentityKey>,
    },

    /// Provider finished a login call (internal)
    LoginFinished {
        epoch: u64,
        result: Result<(), ChannelError>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Consumer asked to sign out
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Get current metrics
    GetMetrics {
        reply: oneshot::Sender<SessionMetrics>,
    },

    /// Shutdown the coordinator
    Shutdown,
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Current generation
    pub generation: u64,
    /// Profile fetches issued
    pub profile_fetches: u64,
    /// Dependent resource fetches issued
    pub resource_fetches: u64,
    /// Results discarded because their generation was superseded
    pub stale_results: u64,
    /// Orphan timers armed
    pub timers_armed: u64,
    /// Orphan timer firings received, stale ones included
    pub timers_fired: u64,
    /// Forced sign-outs
    pub recoveries: u64,
    /// Orphan timers currently armed (0 or 1)
    pub armed_timers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Login(ChannelError::InvalidCredentials);
        assert_eq!(err.to_string(), "Login failed: Invalid credentials");
        assert_eq!(SessionError::Stopped.to_string(), "Session coordinator stopped");
    }

    #[test]
    fn test_metrics_serialization() {
        let metrics = SessionMetrics {
            generation: 3,
            recoveries: 1,
            ..Default::default()
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains(r#""generation":3"#));
        assert!(json.contains(r#""recoveries":1"#));
    }
}
