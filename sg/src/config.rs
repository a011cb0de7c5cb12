//! SessionGate configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::admin::{Role, default_allowed_roles};
use crate::notice::DEFAULT_NOTICE_CAPACITY;
use crate::session::SessionConfig;

/// Main SessionGate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Customer session coordinator
    pub customer: SessionConfig,

    /// Admin session coordinator
    pub admin: AdminConfig,

    /// Notice delivery
    pub notices: NoticeConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        for (scope, session) in [("customer", &self.customer), ("admin", &self.admin.session)] {
            if session.orphan_timeout_ms == 0 {
                eyre::bail!("{}.orphan-timeout-ms must be greater than zero", scope);
            }
        }

        if self.admin.allowed_roles.is_empty() {
            eyre::bail!("admin.allowed-roles is empty; nobody could sign in to the admin area");
        }

        if self.notices.capacity == 0 {
            eyre::bail!("notices.capacity must be greater than zero");
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// 1. Explicit path if provided
    /// 2. Project-local: .sessiongate.yml
    /// 3. User config: ~/.config/sessiongate/sessiongate.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".sessiongate.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sessiongate").join("sessiongate.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Admin coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(flatten)]
    pub session: SessionConfig,

    /// Roles allowed into the admin area
    #[serde(rename = "allowed-roles", default = "default_allowed_roles")]
    pub allowed_roles: Vec<Role>,

    /// Write every access decision to the audit log
    #[serde(default = "default_audit")]
    pub audit: bool,
}

fn default_audit() -> bool {
    true
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            allowed_roles: default_allowed_roles(),
            audit: true,
        }
    }
}

/// Notice delivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Broadcast buffer per subscriber
    pub capacity: usize,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}
