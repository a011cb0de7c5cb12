//! External collaborators consumed by the coordinator
//!
//! - [`IdentityChannel`] - push-based source of "who is signed in"
//! - [`ProfileFetcher`] - loads the application profile for an identity
//! - [`ResourceFetcher`] - dependent data that gates readiness (addresses, ...)
//!
//! The in-memory implementations in [`memory`] back the scenario runner and
//! the test suites.

mod error;
mod fetcher;
mod identity;
pub mod memory;

pub use error::{ChannelError, FetchError};
pub use fetcher::{ProfileFetcher, ResourceFetcher};
pub use identity::{AuthChange, Credentials, IdentityChannel, IdentityEvent, Subscription};
pub use memory::{MemoryIdentityChannel, MemoryProfileStore, MemoryResource};
