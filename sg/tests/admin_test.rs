//! Integration tests for the admin session and its role gate

mod common;

use std::sync::Arc;
use std::time::Duration;

use sessiongate::admin::{AuditAction, MemoryAuditSink, default_allowed_roles};
use sessiongate::provider::{MemoryIdentityChannel, MemoryProfileStore, MemoryResource};
use sessiongate::{
    AdminProfile, AuthChange, CustomerProfile, IdentityKey, RecoveryReason, Role, RoleGate, SessionConfig,
    admin_coordinator, customer_coordinator,
};
use tokio::time::Instant;

use common::NoticeLog;

fn staff(id: &str, role: Role) -> AdminProfile {
    AdminProfile {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        full_name: "Sam Reyes".to_string(),
        role,
    }
}

#[tokio::test(start_paused = true)]
async fn test_admin_role_reaches_ready() {
    let channel = Arc::new(MemoryIdentityChannel::new("admin").with_current("u-9"));
    let profiles = Arc::new(MemoryProfileStore::new());
    profiles.insert("u-9", staff("u-9", Role::Admin));
    let audit = MemoryAuditSink::new();
    let gate = RoleGate::new("admin", default_allowed_roles()).with_audit(Arc::new(audit.clone()));

    let handle = admin_coordinator(SessionConfig::default(), gate, channel, profiles).spawn();
    let snap = handle.wait_for(|s| s.is_ready()).await.unwrap();

    assert_eq!(snap.profile.map(|p| p.role), Some(Role::Admin));
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::AccessAllow);
    assert_eq!(events[0].actor, "user:u-9");
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_role_recovers_with_access_denied() {
    let channel = Arc::new(MemoryIdentityChannel::new("admin").with_current("u-9"));
    let profiles = Arc::new(MemoryProfileStore::new());
    profiles.insert("u-9", staff("u-9", Role::Staff));
    let audit = MemoryAuditSink::new();
    let notices = NoticeLog::default();
    let gate = RoleGate::new("admin", default_allowed_roles()).with_audit(Arc::new(audit.clone()));

    let handle = admin_coordinator(SessionConfig::default(), gate, channel.clone(), profiles)
        .with_notifier(Arc::new(notices.clone()))
        .spawn();

    // Rejected profile is never exposed
    let snap = handle.wait_for(|s| !s.loading).await.unwrap();
    assert_eq!(snap.identity, Some(IdentityKey::new("u-9")));
    assert_eq!(snap.profile, None);
    let start = Instant::now();

    let snap = handle.wait_for(|s| s.is_signed_out()).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(snap.recovery, Some(RecoveryReason::AccessDenied));
    assert_eq!(notices.recoveries(), vec![RecoveryReason::AccessDenied]);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(channel.logout_calls(), 1);
    let actions: Vec<_> = audit.events().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::AccessDeny]);
}

#[tokio::test(start_paused = true)]
async fn test_configured_roles_admit_staff() {
    let channel = Arc::new(MemoryIdentityChannel::new("admin").with_current("u-9"));
    let profiles = Arc::new(MemoryProfileStore::new());
    profiles.insert("u-9", staff("u-9", Role::Staff));
    let gate = RoleGate::new("admin", vec![Role::Staff, Role::Admin]);

    let handle = admin_coordinator(SessionConfig::default(), gate, channel, profiles).spawn();
    handle.wait_for(|s| s.is_ready()).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unknown_role_is_denied() {
    let channel = Arc::new(MemoryIdentityChannel::new("admin").with_current("u-9"));
    let profiles = Arc::new(MemoryProfileStore::new());
    profiles.insert("u-9", staff("u-9", Role::from("auditor")));
    let notices = NoticeLog::default();
    let gate = RoleGate::new("admin", default_allowed_roles());

    let handle = admin_coordinator(SessionConfig::default(), gate, channel, profiles)
        .with_notifier(Arc::new(notices.clone()))
        .spawn();
    handle.wait_for(|s| s.is_signed_out()).await.unwrap();
    assert_eq!(notices.recoveries(), vec![RecoveryReason::AccessDenied]);
}

#[tokio::test(start_paused = true)]
async fn test_customer_and_admin_sessions_are_independent() {
    let customer_channel = Arc::new(MemoryIdentityChannel::new("customer"));
    let admin_channel = Arc::new(MemoryIdentityChannel::new("admin"));

    let customers: Arc<MemoryProfileStore<CustomerProfile>> = Arc::new(MemoryProfileStore::new());
    let admins = Arc::new(MemoryProfileStore::new());
    admins.insert("u-9", staff("u-9", Role::Superadmin));

    let customer = customer_coordinator(
        SessionConfig::default(),
        customer_channel.clone(),
        customers,
        Arc::new(MemoryResource::new("addresses")),
    )
    .spawn();
    let admin = admin_coordinator(
        SessionConfig::default(),
        RoleGate::new("admin", default_allowed_roles()),
        admin_channel.clone(),
        admins,
    )
    .spawn();

    customer.wait_for(|s| !s.loading).await.unwrap();
    admin.wait_for(|s| !s.loading).await.unwrap();

    admin_channel.emit(AuthChange::SignedIn, Some(IdentityKey::new("u-9")));
    admin.wait_for(|s| s.is_ready()).await.unwrap();

    // Customer side never saw the admin identity, so nothing to recover there
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(customer.snapshot().is_signed_out());
    assert!(admin.snapshot().is_ready());
    assert_eq!(customer.metrics().await.unwrap().profile_fetches, 0);
    assert_eq!(customer_channel.logout_calls(), 0);
}
