//! Runtime configuration
//!
//! Tunables for the directory layer, composed from defaults, an optional
//! TOML file, and `CANOPY_*` environment variables (highest precedence,
//! `__` separates nested keys).

use crate::logging::LoggingConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the VFS directory layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfsConfig {
    /// Maximum concurrent descendant fix-ups during a move.
    #[serde(default = "default_fanout_width")]
    pub fanout_width: usize,

    /// Result cap for one children fetch; entries beyond it are not
    /// returned (pagination is not modeled at this layer).
    #[serde(default = "default_children_page_size")]
    pub children_page_size: usize,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_fanout_width() -> usize {
    8
}

fn default_children_page_size() -> usize {
    100
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            fanout_width: default_fanout_width(),
            children_page_size: default_children_page_size(),
            logging: LoggingConfig::default(),
        }
    }
}

impl VfsConfig {
    /// Load configuration with precedence: defaults, then `file` when given,
    /// then `CANOPY_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        let builder = builder.add_source(
            Environment::with_prefix("CANOPY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
