//! Engine configuration
//!
//! Loaded from a JSON file; every key is optional.
//!
//! ```json
//! {
//!   "eager_synthesis": false,
//!   "strict_deserialize_default": false,
//!   "strict_serialize_default": true,
//!   "log_soft_failures": true,
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synthesize each struct's bundle when it is defined instead of on first use
    #[serde(default)]
    pub eager_synthesis: bool,

    /// Strictness used by callers that do not pass one (CLI `convert`)
    #[serde(default)]
    pub strict_deserialize_default: bool,

    #[serde(default = "default_strict_serialize")]
    pub strict_serialize_default: bool,

    /// Send soft (logged, not raised) failures to the log
    #[serde(default = "default_log_soft_failures")]
    pub log_soft_failures: bool,

    /// Minimum log severity: trace, info, warn, error, fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_strict_serialize() -> bool {
    true
}

fn default_log_soft_failures() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eager_synthesis: false,
            strict_deserialize_default: false,
            strict_serialize_default: default_strict_serialize(),
            log_soft_failures: default_log_soft_failures(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display.clone(),
                message: e.to_string(),
            })?;
        config.validate()?;
        log_event_with_fields(Event::ConfigLoaded, &[("path", display.as_str())]);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.severity().map(|_| ())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Result<Severity, ConfigError> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(ConfigError::Invalid(format!(
                "unknown log_level '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.eager_synthesis);
        assert!(config.strict_serialize_default);
        assert!(config.log_soft_failures);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"eager_synthesis": true}"#).unwrap();
        assert!(config.eager_synthesis);
        assert!(config.strict_serialize_default);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"log_level": "warn", "strict_deserialize_default": true}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.strict_deserialize_default);
        assert_eq!(config.severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"log_level": "loud"}}"#).unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
