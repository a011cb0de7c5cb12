//! Profile and dependent-resource fetch contracts

use async_trait::async_trait;

use super::FetchError;
use crate::domain::IdentityKey;

/// Loads the application profile for an identity
///
/// Must be callable concurrently with its own earlier invocations. Results
/// are told apart by the generation the coordinator attached when issuing
/// the call, not by anything the fetcher does.
#[async_trait]
pub trait ProfileFetcher<P>: Send + Sync {
    /// `Ok(None)` means the lookup succeeded and found no record
    async fn fetch(&self, identity: &IdentityKey) -> Result<Option<P>, FetchError>;
}

/// Loads a dependent resource that readiness waits on
///
/// Failures are reported but never block readiness and never start the
/// orphan recovery timer.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Stable name used in snapshots and notices
    fn name(&self) -> &str;

    async fn fetch(&self, identity: &IdentityKey) -> Result<serde_json::Value, FetchError>;
}
