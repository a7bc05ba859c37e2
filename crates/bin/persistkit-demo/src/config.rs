//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `persistkit.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use persistkit_domain::search::{SearchMode, SearchTemplate};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default search template handed to the entity service.
    pub search: SearchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Defaults applied to every query that does not bring its own template.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size; unset means unbounded.
    pub max_results: Option<u32>,
    pub search_mode: SearchMode,
    pub case_sensitive: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `persistkit.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("persistkit.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("PERSISTKIT_MAX_RESULTS") {
            let max = val.parse().map_err(|_| {
                ConfigError::Validation(format!("PERSISTKIT_MAX_RESULTS is not a number: {val}"))
            })?;
            self.search.max_results = Some(max);
        }
        if let Some(val) = var("PERSISTKIT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_results == Some(0) {
            return Err(ConfigError::Validation(
                "search.max_results must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            search_mode: SearchMode::default(),
            case_sensitive: true,
        }
    }
}

impl From<&SearchConfig> for SearchTemplate {
    fn from(config: &SearchConfig) -> Self {
        let template = SearchTemplate::new()
            .with_search_mode(config.search_mode)
            .with_case_sensitive(config.case_sensitive);
        match config.max_results {
            Some(max) => template.with_max_results(max),
            None => template,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "persistkit_demo=info,persistkit=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
