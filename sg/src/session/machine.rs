//! Session state machine
//!
//! A synchronous transition function over the combined identity/profile
//! state. It performs no I/O: every suspension (profile fetch, resource
//! fetch, orphan timer) is returned as an [`Effect`] tagged with the
//! generation it was issued under, and its completion comes back as a
//! [`SessionInput`] carrying that same tag. A completion is applied only
//! while its tag is still the current generation.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::messages::SessionMetrics;
use super::policy::{Acceptance, AcceptancePolicy};
use super::snapshot::{ResourceState, SessionSnapshot};
use crate::domain::{Generation, IdentityKey, IdentityState};
use crate::notice::{RecoveryReason, SessionNotice};
use crate::provider::FetchError;

/// Internal coordinator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Identity not yet reported
    Unknown,
    Unauthenticated,
    /// Identity known, profile fetch in flight
    LoadingProfile,
    /// Profile accepted; dependent resources may still be loading
    Ready,
    /// Profile absent, rejected or failed; orphan timer armed
    ProfileMissing { reason: RecoveryReason },
    /// Transient while state is torn down on the way to `Unauthenticated`
    LoggingOut,
}

/// Inputs that drive the machine
#[derive(Debug)]
pub enum SessionInput<P> {
    Identity(Option<IdentityKey>),
    ChannelFailed {
        message: String,
    },
    ProfileLoaded {
        generation: Generation,
        result: Result<Option<P>, FetchError>,
    },
    ResourceLoaded {
        generation: Generation,
        name: String,
        result: Result<serde_json::Value, FetchError>,
    },
    OrphanTimerFired {
        generation: Generation,
    },
    LoginStarted,
    /// Identity read back after a successful login, tagged with the
    /// generation current when the login started
    LoginIdentity {
        generation: Generation,
        identity: Option<IdentityKey>,
    },
    /// A login call returned; `epoch` is the login epoch it started under
    LoginFinished {
        epoch: u64,
        succeeded: bool,
    },
    Logout,
}

/// Side effects the coordinator must carry out, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchProfile {
        generation: Generation,
        identity: IdentityKey,
    },
    FetchResources {
        generation: Generation,
        identity: IdentityKey,
    },
    /// Arm the orphan timer; any previously armed timer is cancelled first
    ArmOrphanTimer {
        generation: Generation,
        delay: Duration,
    },
    CancelOrphanTimer {
        generation: Generation,
    },
    Notify(SessionNotice),
    /// Sign out at the provider (orphaned identity, or a login the user
    /// abandoned by logging out)
    SignOut,
}

/// Generic coordinator state machine
pub struct SessionMachine<P, A> {
    scope: String,
    policy: A,
    resource_names: Vec<String>,
    orphan_timeout: Duration,

    identity: IdentityState,
    phase: SessionPhase,
    profile: Option<P>,
    resources: BTreeMap<String, ResourceState>,
    generation: Generation,
    profile_in_flight: Option<Generation>,
    orphan_timer: Option<Generation>,
    logins_in_flight: usize,
    login_epoch: u64,
    login_since_logout: bool,
    recovery: Option<RecoveryReason>,

    metrics: SessionMetrics,
}

impl<P, A> SessionMachine<P, A>
where
    P: Clone,
    A: AcceptancePolicy<P>,
{
    pub fn new(scope: impl Into<String>, policy: A, orphan_timeout: Duration) -> Self {
        Self {
            scope: scope.into(),
            policy,
            resource_names: Vec::new(),
            orphan_timeout,
            identity: IdentityState::Unknown,
            phase: SessionPhase::Unknown,
            profile: None,
            resources: BTreeMap::new(),
            generation: Generation::ZERO,
            profile_in_flight: None,
            orphan_timer: None,
            logins_in_flight: 0,
            login_epoch: 0,
            login_since_logout: false,
            recovery: None,
            metrics: SessionMetrics::default(),
        }
    }

    /// Register a dependent resource that readiness waits on
    pub fn with_resource(mut self, name: impl Into<String>) -> Self {
        self.resource_names.push(name.into());
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn identity(&self) -> &IdentityState {
        &self.identity
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Bumped by every explicit logout; logins started earlier no longer count
    pub fn login_epoch(&self) -> u64 {
        self.login_epoch
    }

    /// Generation the orphan timer is armed for, if any
    pub fn armed_timer(&self) -> Option<Generation> {
        self.orphan_timer
    }

    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            generation: self.generation.value(),
            armed_timers: usize::from(self.orphan_timer.is_some()),
            ..self.metrics.clone()
        }
    }

    /// Readiness signal for the current state
    pub fn snapshot(&self) -> SessionSnapshot<P> {
        SessionSnapshot::derive(
            &self.identity,
            &self.phase,
            self.profile.as_ref(),
            &self.resources,
            self.logins_in_flight,
            self.recovery,
        )
    }

    /// Apply one input and return the effects to execute
    pub fn apply(&mut self, input: SessionInput<P>) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            SessionInput::Identity(Some(identity)) => self.on_identity(identity, &mut effects),
            SessionInput::Identity(None) => self.on_signed_out(&mut effects),
            SessionInput::ChannelFailed { message } => self.on_channel_failed(&message, &mut effects),
            SessionInput::ProfileLoaded { generation, result } => self.on_profile(generation, result, &mut effects),
            SessionInput::ResourceLoaded {
                generation,
                name,
                result,
            } => self.on_resource(generation, name, result, &mut effects),
            SessionInput::OrphanTimerFired { generation } => self.on_orphan_timer(generation, &mut effects),
            SessionInput::LoginStarted => {
                self.logins_in_flight += 1;
                self.login_since_logout = true;
            }
            SessionInput::LoginIdentity { generation, identity } => {
                if generation != self.generation {
                    debug!(scope = %self.scope, %generation, current = %self.generation, "Discarding stale login identity");
                    self.metrics.stale_results += 1;
                } else {
                    match identity {
                        Some(identity) => self.on_identity(identity, &mut effects),
                        None => self.on_signed_out(&mut effects),
                    }
                }
            }
            SessionInput::LoginFinished { epoch, succeeded } => {
                if epoch == self.login_epoch {
                    self.logins_in_flight = self.logins_in_flight.saturating_sub(1);
                } else if succeeded && !self.login_since_logout {
                    info!(scope = %self.scope, epoch, "Login completed after logout, signing out");
                    effects.push(Effect::SignOut);
                } else {
                    debug!(scope = %self.scope, epoch, current = self.login_epoch, "Login finished after logout");
                }
            }
            SessionInput::Logout => {
                info!(scope = %self.scope, "Logout requested");
                self.tear_down(&mut effects);
                self.logins_in_flight = 0;
                self.login_epoch += 1;
                self.login_since_logout = false;
                self.recovery = None;
            }
        }
        effects
    }

    fn on_identity(&mut self, identity: IdentityKey, effects: &mut Vec<Effect>) {
        if self.identity.matches(Some(&identity)) {
            debug!(scope = %self.scope, %identity, "Identity unchanged, ignoring");
            return;
        }

        self.cancel_orphan_timer(effects);
        self.generation = self.generation.next();
        self.identity = IdentityState::Known(identity.clone());
        self.profile = None;
        self.resources.clear();
        self.recovery = None;
        self.phase = SessionPhase::LoadingProfile;
        self.profile_in_flight = Some(self.generation);
        self.metrics.profile_fetches += 1;

        info!(scope = %self.scope, %identity, generation = %self.generation, "Identity changed, loading profile");
        effects.push(Effect::FetchProfile {
            generation: self.generation,
            identity,
        });
    }

    fn on_signed_out(&mut self, effects: &mut Vec<Effect>) {
        if self.identity.matches(None) {
            debug!(scope = %self.scope, "Already signed out, ignoring");
            return;
        }
        info!(scope = %self.scope, "Identity cleared");
        self.tear_down(effects);
    }

    fn on_channel_failed(&mut self, message: &str, effects: &mut Vec<Effect>) {
        warn!(scope = %self.scope, %message, "Identity channel failed");
        let was_signed_out = self.identity.matches(None);
        self.tear_down(effects);
        if !was_signed_out {
            self.recover(RecoveryReason::ChannelError, effects);
        }
    }

    fn on_profile(&mut self, generation: Generation, result: Result<Option<P>, FetchError>, effects: &mut Vec<Effect>) {
        if generation != self.generation || self.profile_in_flight != Some(generation) {
            debug!(scope = %self.scope, %generation, current = %self.generation, "Discarding stale profile result");
            self.metrics.stale_results += 1;
            return;
        }
        self.profile_in_flight = None;

        let Some(identity) = self.identity.key().cloned() else {
            return;
        };

        match result {
            Ok(Some(profile)) => match self.policy.evaluate(&identity, &profile) {
                Acceptance::Accept => self.accept(identity, profile, effects),
                Acceptance::Reject(reason) => {
                    warn!(scope = %self.scope, %identity, %reason, "Profile rejected");
                    self.await_recovery(reason, effects);
                }
            },
            Ok(None) => {
                warn!(scope = %self.scope, %identity, "Profile missing");
                self.await_recovery(RecoveryReason::ProfileMissing, effects);
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(scope = %self.scope, %identity, error = %e, "Profile fetch failed");
                } else {
                    error!(scope = %self.scope, %identity, error = %e, "Profile fetch failed");
                }
                effects.push(Effect::Notify(SessionNotice::ProfileFetchFailed {
                    scope: self.scope.clone(),
                    message: e.to_string(),
                }));
                self.await_recovery(RecoveryReason::ProfileMissing, effects);
            }
        }
    }

    fn accept(&mut self, identity: IdentityKey, profile: P, effects: &mut Vec<Effect>) {
        self.profile = Some(profile);
        self.phase = SessionPhase::Ready;

        if self.resource_names.is_empty() {
            info!(scope = %self.scope, %identity, "Session ready");
            return;
        }

        for name in &self.resource_names {
            self.resources.insert(name.clone(), ResourceState::Pending);
        }
        self.metrics.resource_fetches += self.resource_names.len() as u64;
        debug!(scope = %self.scope, %identity, count = self.resource_names.len(), "Loading dependent resources");
        effects.push(Effect::FetchResources {
            generation: self.generation,
            identity,
        });
    }

    fn on_resource(
        &mut self,
        generation: Generation,
        name: String,
        result: Result<serde_json::Value, FetchError>,
        effects: &mut Vec<Effect>,
    ) {
        if generation != self.generation || self.phase != SessionPhase::Ready {
            debug!(scope = %self.scope, %generation, resource = %name, "Discarding stale resource result");
            self.metrics.stale_results += 1;
            return;
        }

        let Some(state) = self.resources.get_mut(&name).filter(|s| s.is_pending()) else {
            debug!(scope = %self.scope, resource = %name, "Unexpected resource result, ignoring");
            return;
        };

        match result {
            Ok(value) => *state = ResourceState::Loaded(value),
            Err(e) => {
                warn!(scope = %self.scope, resource = %name, error = %e, "Resource fetch failed");
                *state = ResourceState::Failed;
                effects.push(Effect::Notify(SessionNotice::ResourceFetchFailed {
                    scope: self.scope.clone(),
                    resource: name,
                    message: e.to_string(),
                }));
            }
        }

        if !self.resources.values().any(ResourceState::is_pending) {
            info!(scope = %self.scope, "Session ready");
        }
    }

    fn on_orphan_timer(&mut self, generation: Generation, effects: &mut Vec<Effect>) {
        self.metrics.timers_fired += 1;

        if self.orphan_timer != Some(generation) || generation != self.generation {
            debug!(scope = %self.scope, %generation, "Stale orphan timer, ignoring");
            return;
        }

        let reason = match (&self.phase, self.identity.key(), &self.profile) {
            (SessionPhase::ProfileMissing { reason }, Some(_), None) => *reason,
            _ => {
                debug!(scope = %self.scope, phase = ?self.phase, "Orphan conditions no longer hold, ignoring");
                self.orphan_timer = None;
                return;
            }
        };

        warn!(scope = %self.scope, identity = %self.identity, %reason, "Orphan session, forcing sign-out");
        // Fired timers need no cancel effect
        self.orphan_timer = None;
        self.tear_down(effects);
        self.recover(reason, effects);
        effects.push(Effect::SignOut);
    }

    /// Profile unusable: arm the orphan timer unless already armed for this generation
    fn await_recovery(&mut self, reason: RecoveryReason, effects: &mut Vec<Effect>) {
        self.phase = SessionPhase::ProfileMissing { reason };

        if self.orphan_timer == Some(self.generation) {
            debug!(scope = %self.scope, generation = %self.generation, "Orphan timer already armed");
            return;
        }

        self.cancel_orphan_timer(effects);
        self.orphan_timer = Some(self.generation);
        self.metrics.timers_armed += 1;
        effects.push(Effect::ArmOrphanTimer {
            generation: self.generation,
            delay: self.orphan_timeout,
        });
    }

    fn recover(&mut self, reason: RecoveryReason, effects: &mut Vec<Effect>) {
        self.recovery = Some(reason);
        self.metrics.recoveries += 1;
        effects.push(Effect::Notify(SessionNotice::Recovered {
            scope: self.scope.clone(),
            reason,
        }));
    }

    fn cancel_orphan_timer(&mut self, effects: &mut Vec<Effect>) {
        if let Some(generation) = self.orphan_timer.take() {
            effects.push(Effect::CancelOrphanTimer { generation });
        }
    }

    /// Every path back to `Unauthenticated` goes through here
    ///
    /// Bumping the generation makes any in-flight fetch or timer inert.
    fn tear_down(&mut self, effects: &mut Vec<Effect>) {
        self.phase = SessionPhase::LoggingOut;
        self.generation = self.generation.next();
        self.profile_in_flight = None;
        self.cancel_orphan_timer(effects);
        self.profile = None;
        self.resources.clear();
        self.identity = IdentityState::Anonymous;
        self.phase = SessionPhase::Unauthenticated;
    }
}
