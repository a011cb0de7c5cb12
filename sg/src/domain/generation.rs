//! Generation counter used to discard superseded asynchronous results

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic version of the coordinator's identity epoch
///
/// Every fetch and timer is tagged with the generation active when it was
/// issued; a result is applied only while its tag is still current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const ZERO: Generation = Generation(0);

    /// The generation that follows this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}
