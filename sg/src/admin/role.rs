//! Roles and the admin access gate

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::audit::{AuditEvent, AuditSink};
use crate::domain::IdentityKey;
use crate::notice::RecoveryReason;
use crate::session::{Acceptance, AcceptancePolicy};

/// Role stored on a profile
///
/// Unknown values are kept verbatim so a new backend role never fails
/// decoding; it is simply not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Customer,
    Staff,
    Admin,
    Superadmin,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "customer" => Self::Customer,
            "staff" => Self::Staff,
            "admin" => Self::Admin,
            "superadmin" => Self::Superadmin,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application profile of an admin-area user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Roles allowed into the admin area unless configured otherwise
pub fn default_allowed_roles() -> Vec<Role> {
    vec![Role::Admin, Role::Superadmin]
}

/// Accepts a profile only when its role is in the allowed set
///
/// Each decision is written to the audit sink. A rejection recovers the
/// session with `access_denied`.
#[derive(Clone)]
pub struct RoleGate {
    scope: String,
    allowed: Vec<Role>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl RoleGate {
    pub fn new(scope: impl Into<String>, allowed: Vec<Role>) -> Self {
        let scope = scope.into();
        debug!(%scope, ?allowed, "RoleGate::new: called");
        Self {
            scope,
            allowed,
            sink: None,
        }
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn allows(&self, role: &Role) -> bool {
        self.allowed.contains(role)
    }
}

impl AcceptancePolicy<AdminProfile> for RoleGate {
    fn evaluate(&self, identity: &IdentityKey, profile: &AdminProfile) -> Acceptance {
        let allowed = self.allows(&profile.role);
        debug!(scope = %self.scope, %identity, role = %profile.role, allowed, "RoleGate::evaluate: called");

        if let Some(sink) = &self.sink {
            sink.emit(AuditEvent::decision(&self.scope, identity, &profile.role, allowed));
        }

        if allowed {
            Acceptance::Accept
        } else {
            Acceptance::Reject(RecoveryReason::AccessDenied)
        }
    }
}
