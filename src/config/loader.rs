//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl RelayConfig {
    /// Fill in values that live outside the config file: the API key from
    /// the environment and the system prompt from its file.
    pub fn resolve(&mut self) -> Result<(), ConfigError> {
        if self.upstream.api_key.trim().is_empty() && !self.upstream.api_key_env.is_empty() {
            if let Ok(key) = std::env::var(&self.upstream.api_key_env) {
                self.upstream.api_key = key.trim().to_string();
            }
        }

        if let Some(path) = &self.prompt.system_prompt_file {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            self.prompt.system_prompt = text.trim().to_string();
        }

        Ok(())
    }

    /// Resolve and validate a config built in code rather than loaded from disk.
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        self.resolve()?;
        validate_config(&self).map_err(ConfigError::Validation)?;
        Ok(self)
    }
}

/// Load, resolve and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: RelayConfig = toml::from_str(&content)?;

    config.finalize()
}
