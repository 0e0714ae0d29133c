use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool configuration, read from `.qta-runner.json` or `qta-runner.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Show "run test case" lenses above test-case classes
    pub enable_code_lens: bool,
    /// Package index used by `pip install` when the project does not set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pip_source: Option<String>,
    /// Interpreter used when the project settings name none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_script: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_script: Option<PathBuf>,
    /// Seconds between write-behind flushes of the parse cache
    pub flush_interval_secs: u64,
    /// Upper bound for building the top-level tree listing
    pub listing_timeout_secs: u64,
    /// Default folder name offered when creating a virtualenv
    pub env_dir_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_code_lens: true,
            pip_source: None,
            python: None,
            parser_script: None,
            requirements_script: None,
            flush_interval_secs: 10,
            listing_timeout_secs: 60,
            env_dir_name: ".env".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            let config_path = current.join(".qta-runner.json");
            if config_path.exists() {
                return Some(config_path);
            }

            let config_path = current.join("qta-runner.json");
            if config_path.exists() {
                return Some(config_path);
            }

            current = current.parent()?;
        }
    }

    /// Load the nearest config file above `start_path`, or the defaults
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs.max(1))
    }
}
