//! Acceptance predicates applied to a successfully fetched profile

use crate::domain::IdentityKey;
use crate::notice::RecoveryReason;

/// Outcome of checking a fetched profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accept,
    /// Treated like an absent profile, recovered with the given reason
    Reject(RecoveryReason),
}

/// Decides whether a fetched profile makes the session usable
///
/// The only point where the customer and admin coordinators differ.
pub trait AcceptancePolicy<P>: Send + Sync + 'static {
    fn evaluate(&self, identity: &IdentityKey, profile: &P) -> Acceptance;
}

/// Accepts every profile that exists
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<P> AcceptancePolicy<P> for AcceptAll {
    fn evaluate(&self, _identity: &IdentityKey, _profile: &P) -> Acceptance {
        Acceptance::Accept
    }
}
