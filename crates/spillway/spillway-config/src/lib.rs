mod config;

pub use config::{ConfigError, SpillwayConfig};
