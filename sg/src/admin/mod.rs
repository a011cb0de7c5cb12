//! Admin-facing session
//!
//! Same coordinator as the customer side, instantiated independently with
//! its own identity channel. A profile is only usable when its role passes
//! the [`RoleGate`]; otherwise the session is recovered with `access_denied`.

mod audit;
mod role;

use std::sync::Arc;

pub use audit::{AUDIT_EVENT_VERSION, AUDIT_TARGET, AuditAction, AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use role::{AdminProfile, Role, RoleGate, default_allowed_roles};

use crate::provider::{IdentityChannel, ProfileFetcher};
use crate::session::{SessionConfig, SessionCoordinator};

pub type AdminCoordinator = SessionCoordinator<AdminProfile, RoleGate>;

/// Build the admin coordinator
pub fn admin_coordinator(
    config: SessionConfig,
    gate: RoleGate,
    channel: Arc<dyn IdentityChannel>,
    profiles: Arc<dyn ProfileFetcher<AdminProfile>>,
) -> AdminCoordinator {
    SessionCoordinator::new(config, gate, channel, profiles)
}
