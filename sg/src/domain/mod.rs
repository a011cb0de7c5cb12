//! Domain types shared by every coordinator instantiation
//!
//! Identities come from the identity provider and are never minted here.
//! Generations are owned by the coordinator and tag every asynchronous
//! operation it issues.

mod generation;
mod identity;

pub use generation::Generation;
pub use identity::{IdentityKey, IdentityState};
