//! Optional RON configuration file for the `portal` binary.
//!
//! Every field has a default, so a partial file is fine and a missing file
//! means "all defaults".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "portal.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Root URL of the dashboard collaborator.
    pub server_url: String,
    pub relay_url: String,
    pub settle_delay_ms: u64,
    pub probe_timeout_ms: u64,
    pub log_to_file: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000/".to_string(),
            relay_url: "ws://localhost:3000".to_string(),
            settle_delay_ms: 1000,
            probe_timeout_ms: 1500,
            log_to_file: false,
        }
    }
}

impl PortalConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Load the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<PortalConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(PortalConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
