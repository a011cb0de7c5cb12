//! Session coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Per-scope coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a signed-in identity may stay without a usable profile
    /// before it is signed out
    #[serde(rename = "orphan-timeout-ms", default = "default_orphan_timeout_ms")]
    pub orphan_timeout_ms: u64,

    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_orphan_timeout_ms() -> u64 {
    debug!("default_orphan_timeout_ms: called");
    2000
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        debug!("SessionConfig::default: called");
        Self {
            orphan_timeout_ms: 2000,
            channel_buffer: 256,
        }
    }
}

impl SessionConfig {
    /// Get the orphan recovery delay as a Duration
    pub fn orphan_timeout(&self) -> Duration {
        debug!(orphan_timeout_ms = %self.orphan_timeout_ms, "SessionConfig::orphan_timeout: called");
        Duration::from_millis(self.orphan_timeout_ms)
    }
}
