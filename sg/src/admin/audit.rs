//! Audit trail for admin access decisions
//!
//! Every role check made for the admin session produces one [`AuditEvent`].
//! Events carry the identity key, role and decision only; credentials and
//! tokens never reach this module.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;
use crate::domain::IdentityKey;

/// Version of the audit event schema
pub const AUDIT_EVENT_VERSION: u32 = 1;

/// Tracing target audit events are written to
pub const AUDIT_TARGET: &str = "sessiongate::audit";

/// Access decisions that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    AccessAllow,
    AccessDeny,
}

impl AuditAction {
    pub const fn is_deny(&self) -> bool {
        matches!(self, Self::AccessDeny)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessAllow => write!(f, "ACCESS_ALLOW"),
            Self::AccessDeny => write!(f, "ACCESS_DENY"),
        }
    }
}

/// One access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Schema version for evolution
    pub event_version: u32,

    /// Unique event identifier (UUIDv7, time ordered)
    pub event_id: String,

    pub timestamp: DateTime<Utc>,

    /// Session scope the decision was made for
    pub scope: String,

    /// Actor identity, `user:{key}`
    pub actor: String,

    pub action: AuditAction,

    /// Role found on the profile
    pub role: Role,

    /// Policy that decided (`role_allowed`, `role_not_allowed`)
    pub reason: String,
}

impl AuditEvent {
    /// Record a role decision made now
    pub fn decision(scope: &str, identity: &IdentityKey, role: &Role, allowed: bool) -> Self {
        let (action, reason) = if allowed {
            (AuditAction::AccessAllow, "role_allowed")
        } else {
            (AuditAction::AccessDeny, "role_not_allowed")
        };
        Self {
            event_version: AUDIT_EVENT_VERSION,
            event_id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            scope: scope.to_string(),
            actor: format!("user:{}", identity),
            action,
            role: role.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Destination for audit events
///
/// Emission must not block and must not fail the decision being audited.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Writes audit events as structured tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        if event.action.is_deny() {
            tracing::warn!(
                target: AUDIT_TARGET,
                event_id = %event.event_id,
                scope = %event.scope,
                actor = %event.actor,
                action = %event.action,
                role = %event.role,
                reason = %event.reason,
                "access_decision"
            );
        } else {
            tracing::info!(
                target: AUDIT_TARGET,
                event_id = %event.event_id,
                scope = %event.scope,
                actor = %event.actor,
                action = %event.action,
                role = %event.role,
                reason = %event.reason,
                "access_decision"
            );
        }
    }
}

/// Keeps audit events in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_fields() {
        let event = AuditEvent::decision("admin", &IdentityKey::new("u-9"), &Role::Staff, false);
        assert_eq!(event.event_version, AUDIT_EVENT_VERSION);
        assert_eq!(event.actor, "user:u-9");
        assert_eq!(event.action, AuditAction::AccessDeny);
        assert_eq!(event.reason, "role_not_allowed");
        assert!(Uuid::parse_str(&event.event_id).is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::decision("admin", &IdentityKey::new("u-1"), &Role::Admin, true);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""action":"ACCESS_ALLOW""#));
        assert!(json.contains(r#""role":"admin""#));
        assert!(json.contains(r#""eventVersion":1"#));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        sink.emit(AuditEvent::decision("admin", &IdentityKey::new("u-1"), &Role::Admin, true));
        sink.emit(AuditEvent::decision("admin", &IdentityKey::new("u-2"), &Role::Customer, false));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].actor, "user:u-2");
        assert!(events[1].action.is_deny());
    }
}
