//! SessionGate - session/profile consistency coordinator
//!
//! Sign-in state in a client app arrives from two independent sources: an
//! identity provider that pushes "current user is X" whenever it likes, and
//! a profile store that answers lookups some time later. SessionGate
//! reconciles the two into one readiness snapshot that route guards and UI
//! code can trust.
//!
//! # Core Concepts
//!
//! - **Generation tagging**: every identity change bumps a counter; late
//!   fetch results from an older generation are discarded
//! - **Orphan recovery**: an identity without a usable profile is signed out
//!   after a bounded wait, and a notifier learns why
//! - **Optimistic logout**: local state clears before the provider confirms
//! - **Two audiences**: customer and admin coordinators are independent
//!   instances of the same machine; admin adds a role gate with an audit log
//!
//! # Modules
//!
//! - [`domain`] - Identity keys and generations
//! - [`provider`] - Identity channel and fetcher contracts, in-memory impls
//! - [`notice`] - Recovery notices and their delivery
//! - [`session`] - State machine, coordinator task and consumer handle
//! - [`customer`] - Customer profile and address book
//! - [`admin`] - Roles, role gate and access audit
//! - [`scenario`] - Scenario replay used by the CLI
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod admin;
pub mod cli;
pub mod config;
pub mod customer;
pub mod domain;
pub mod notice;
pub mod provider;
pub mod scenario;
pub mod session;

// Re-export commonly used types
pub use admin::{AdminCoordinator, AdminProfile, AuditEvent, AuditSink, Role, RoleGate, admin_coordinator};
pub use config::{AdminConfig, Config, NoticeConfig};
pub use customer::{Address, CustomerCoordinator, CustomerProfile, customer_coordinator};
pub use domain::{Generation, IdentityKey, IdentityState};
pub use notice::{NoticeBus, NullNotifier, RecoveryNotifier, RecoveryReason, SessionNotice};
pub use provider::{
    AuthChange, ChannelError, Credentials, FetchError, IdentityChannel, IdentityEvent, ProfileFetcher,
    ResourceFetcher, Subscription,
};
pub use session::{
    AcceptAll, Acceptance, AcceptancePolicy, SessionConfig, SessionCoordinator, SessionError, SessionHandle,
    SessionMetrics, SessionSnapshot,
};
