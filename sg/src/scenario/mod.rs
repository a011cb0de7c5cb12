//! Scenario replay
//!
//! A scenario file seeds in-memory providers (accounts, profiles, address
//! books) and lists steps replayed against one coordinator variant. The
//! snapshot and any notices are recorded after every step.

mod report;
mod runner;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

pub use report::{ScenarioReport, StepReport, render_text};
pub use runner::run_scenario;

/// Which coordinator a scenario drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    Customer,
    Admin,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Login account known to the in-memory identity channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
    pub identity: String,
}

/// Fetch a latency or failure step applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchTarget {
    #[default]
    Profile,
    Addresses,
}

/// One replayed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Identity channel reports an identity (`null` for signed out)
    Emit(Option<String>),

    Login { email: String, password: String },

    Logout,

    /// Identity channel reports a failure
    ChannelError(String),

    /// Let time pass
    WaitMs(u64),

    /// Delay future fetches for one identity
    Latency {
        #[serde(default)]
        target: FetchTarget,
        identity: String,
        ms: u64,
    },

    /// Make future fetches for one identity fail with a backend error
    FailFetch {
        #[serde(default)]
        target: FetchTarget,
        identity: String,
        #[serde(default = "default_fail_status")]
        status: u16,
        message: String,
    },
}

fn default_fail_status() -> u16 {
    500
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emit(Some(identity)) => write!(f, "emit {}", identity),
            Self::Emit(None) => write!(f, "emit <signed out>"),
            Self::Login { email, .. } => write!(f, "login {}", email),
            Self::Logout => write!(f, "logout"),
            Self::ChannelError(message) => write!(f, "channel-error {:?}", message),
            Self::WaitMs(ms) => write!(f, "wait {}ms", ms),
            Self::Latency { target, identity, ms } => {
                write!(f, "latency {:?} {} {}ms", target, identity, ms)
            }
            Self::FailFetch {
                target,
                identity,
                status,
                ..
            } => write!(f, "fail-fetch {:?} {} {}", target, identity, status),
        }
    }
}

/// Scenario file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Scenario {
    pub name: String,

    pub variant: Variant,

    /// Overrides the configured orphan timeout for this run
    pub orphan_timeout_ms: Option<u64>,

    /// Time allowed for the coordinator to settle after each step
    pub settle_ms: Option<u64>,

    pub accounts: Vec<Account>,

    /// Identity already signed in when the coordinator starts
    pub current: Option<String>,

    /// Profile records by identity
    pub profiles: BTreeMap<String, serde_json::Value>,

    /// Address books by identity (customer variant)
    pub addresses: BTreeMap<String, serde_json::Value>,

    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).context(format!("Failed to read scenario {}", path.display()))?;
        let scenario: Self =
            serde_yaml::from_str(&content).context(format!("Failed to parse scenario {}", path.display()))?;
        tracing::info!(name = %scenario.name, steps = scenario.steps.len(), "Loaded scenario from: {}", path.display());
        Ok(scenario)
    }
}
