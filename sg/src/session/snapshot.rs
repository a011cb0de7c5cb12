//! Readiness signal derived from coordinator state
//!
//! The snapshot is never stored as independent state: it is recomputed from
//! the machine after every transition and only published when it differs
//! from what consumers already have.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::machine::SessionPhase;
use crate::domain::{IdentityKey, IdentityState};
use crate::notice::RecoveryReason;

/// Load state of one dependent resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "kebab-case")]
pub enum ResourceState {
    Pending,
    Loaded(serde_json::Value),
    /// Failure details go to the notifier, not the snapshot
    Failed,
}

impl ResourceState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// What consumers (route guards, UI components) see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot<P> {
    /// Signed-in identity; `None` while unknown or signed out
    pub identity: Option<IdentityKey>,

    /// Profile, present only once the session is ready
    pub profile: Option<P>,

    /// True while anything readiness depends on is still outstanding
    pub loading: bool,

    /// Dependent resources by name
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,

    /// Reason for the last forced sign-out, until a new identity arrives
    pub recovery: Option<RecoveryReason>,
}

impl<P> Default for SessionSnapshot<P> {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
            resources: BTreeMap::new(),
            recovery: None,
        }
    }
}

impl<P: Clone> SessionSnapshot<P> {
    /// Compute the snapshot from coordinator state
    pub(crate) fn derive(
        identity: &IdentityState,
        phase: &SessionPhase,
        profile: Option<&P>,
        resources: &BTreeMap<String, ResourceState>,
        logins_in_flight: usize,
        recovery: Option<RecoveryReason>,
    ) -> Self {
        let ready = matches!(phase, SessionPhase::Ready);
        let resources_pending = resources.values().any(ResourceState::is_pending);

        let loading = identity.is_unknown()
            || matches!(phase, SessionPhase::LoadingProfile)
            || (ready && resources_pending)
            || logins_in_flight > 0;

        Self {
            identity: identity.key().cloned(),
            profile: if ready { profile.cloned() } else { None },
            loading,
            resources: resources.clone(),
            recovery,
        }
    }
}

impl<P> SessionSnapshot<P> {
    /// Signed in, profile accepted, nothing outstanding
    pub fn is_ready(&self) -> bool {
        !self.loading && self.identity.is_some() && self.profile.is_some()
    }

    /// Settled with nobody signed in
    pub fn is_signed_out(&self) -> bool {
        !self.loading && self.identity.is_none()
    }
}
