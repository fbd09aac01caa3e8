use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct SpillwayConfig {
    #[serde(default = "defaults::queue_path")]
    pub queue_path: String,
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "defaults::poll_interval_us")]
    pub poll_interval_us: u64,
    #[serde(default = "defaults::log_file")]
    pub log_file: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn queue_path() -> String {
        "/var/tmp/sluice_queue".into()
    }

    pub fn queue_capacity() -> usize {
        10240
    }

    pub fn poll_interval_us() -> u64 {
        1000
    }

    pub fn log_file() -> String {
        "/var/tmp/spillway.log".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl SpillwayConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: SpillwayConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Loads `path` when it exists; a missing file means all defaults.
    pub fn load_if_present(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(toml::from_str("")?)
        }
    }
}
