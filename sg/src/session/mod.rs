//! Session/profile consistency coordinator
//!
//! Reconciles an asynchronously reported identity with an asynchronously
//! loaded profile and publishes a single readiness snapshot:
//! - **Generations:** every identity change and every logout bumps a
//!   counter; fetch and timer results tagged with an older value are dropped
//! - **Orphan recovery:** an identity whose profile is absent or rejected is
//!   signed out after a bounded wait, with the reason sent to a notifier
//! - **Actions:** login and logout go through the identity channel; logout
//!   clears local state before the provider confirms

mod config;
mod core;
mod handle;
mod machine;
mod messages;
mod policy;
mod snapshot;

pub use config::SessionConfig;
pub use core::SessionCoordinator;
pub use handle::SessionHandle;
pub use machine::{Effect, SessionInput, SessionMachine, SessionPhase};
pub use messages::{SessionError, SessionMetrics, SessionRequest};
pub use policy::{AcceptAll, Acceptance, AcceptancePolicy};
pub use snapshot::{ResourceState, SessionSnapshot};
