//! TOML configuration for the calculus.
//!
//! ```toml
//! [alphabet]
//! Human = 1
//! Loves = 2
//!
//! [engine]
//! verify_results = true
//! fail_fast = false
//! max_selection = 4096
//! ```
//!
//! The identity relation `=` is implicit and need not be listed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::ConfigError;
use crate::rules::RuleEngineConfig;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Alphabet and engine settings, loadable from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculusConfig {
    /// Relation name to arity.
    pub alphabet: BTreeMap<String, usize>,
    pub engine: RuleEngineConfig,
}

impl CalculusConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse TOML held in memory.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(
            origin,
            relations = config.alphabet.len(),
            max_selection = config.engine.max_selection,
            "loaded calculus config"
        );
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Build the validated alphabet the table describes.
    pub fn alphabet(&self) -> ConfigResult<Alphabet> {
        let mut alphabet = Alphabet::new();
        for (name, &arity) in &self.alphabet {
            alphabet.register(name.as_str(), arity)?;
        }
        Ok(alphabet)
    }

    pub fn engine(&self) -> &RuleEngineConfig {
        &self.engine
    }
}
