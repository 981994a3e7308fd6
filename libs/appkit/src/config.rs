//! Application configuration and parameter lookup.
//!
//! Configuration is merged from figment providers (defaults, a YAML file,
//! environment variables) into a single JSON tree. Parameters are addressed
//! with dot-separated paths (`"app.cache_dir"`), mirroring how the rest of
//! the stack refers to them.

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration error for parameter lookups and loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("parameter '{path}' not found")]
    MissingParameter { path: String },

    #[error("invalid value for parameter '{path}': {source}")]
    InvalidParameter {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Provider of the merged configuration tree.
pub trait ConfigProvider: Send + Sync {
    /// The merged configuration as JSON.
    fn raw(&self) -> &serde_json::Value;

    /// Look up a parameter by dot-separated path.
    fn parameter(&self, path: &str) -> Option<&serde_json::Value> {
        let mut current = self.raw();
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

/// Typed parameter lookup over any [`ConfigProvider`].
///
/// # Errors
/// Returns [`ConfigError::MissingParameter`] when the path does not resolve,
/// [`ConfigError::InvalidParameter`] when the value does not deserialize.
pub fn parameter_as<T: DeserializeOwned>(
    provider: &dyn ConfigProvider,
    path: &str,
) -> Result<T, ConfigError> {
    let value = provider
        .parameter(path)
        .ok_or_else(|| ConfigError::MissingParameter {
            path: path.to_owned(),
        })?;

    serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidParameter {
        path: path.to_owned(),
        source: e,
    })
}

/// Figment-backed configuration: defaults < YAML file < `APP_`-prefixed env.
pub struct FigmentConfig {
    root: serde_json::Value,
}

impl FigmentConfig {
    /// Extract the merged tree out of an arbitrary figment.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` when extraction fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let root: serde_json::Value = figment.extract().map_err(Box::new)?;
        Ok(Self { root })
    }

    /// Standard application layering: the given YAML file overridden by
    /// `APP_`-prefixed environment variables (`APP_DB__DSN` → `db.dsn`).
    ///
    /// # Errors
    /// Returns `ConfigError::Load` when the file or environment is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("APP_").split("__"));
        Self::from_figment(figment)
    }

    /// Build directly from an in-memory JSON tree (tests, embedding).
    #[must_use]
    pub fn from_value(root: serde_json::Value) -> Self {
        Self { root }
    }
}

impl ConfigProvider for FigmentConfig {
    fn raw(&self) -> &serde_json::Value {
        &self.root
    }
}
