//! Runtime configuration
//!
//! Configuration is threaded explicitly into the heap, the listener registry
//! and the decoder. Values come from defaults or a JSON document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default cap on registered listeners
pub const DEFAULT_MAX_LISTENERS: usize = 1000;

/// ABC major version produced by the ActionScript 3 compilers
pub const ABC_MAJOR_VERSION: u16 = 46;

/// Tunables for the object runtime and the module decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of live listeners a registry accepts before asserting
    pub max_listeners: usize,
    /// Collect unreachable cycles synchronously when a release may have orphaned one
    pub collect_cycles: bool,
    /// Trace every decoded record
    pub verbose_parse: bool,
    /// Required ABC major version (`None` accepts any)
    pub expected_major_version: Option<u16>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            collect_cycles: true,
            verbose_parse: false,
            expected_major_version: Some(ABC_MAJOR_VERSION),
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_listeners == 0 {
            return Err(ConfigError::Invalid(
                "max_listeners must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
