//! Configuration for a capture session
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration.

use std::any::Any;
use std::path::{Path, PathBuf};

use rebugger_error::{codes, ErrorCategory, ErrorCode, RebugError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl RebugError for ConfigError {
    fn error_code(&self) -> ErrorCode {
        codes::CONFIG
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RebugConfig {
    pub capture: CaptureConfig,
    pub render: RenderConfig,
    pub trace: TraceConfig,
    pub logging: LoggingConfig,
}

/// Instrumentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Prefix of the private names shadow methods are installed under
    pub hidden_prefix: String,
    /// Interpreter recursion limit
    pub max_call_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { hidden_prefix: "__rebugger_hidden_".to_string(), max_call_depth: rebugger_lang::DEFAULT_MAX_DEPTH }
    }
}

/// Replay block layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Spaces used to indent the body of a rendered block
    pub indent: usize,
    /// Module exposing `getstored`, `store` and `stop`
    pub store_module: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { indent: 4, store_module: "Rebugger".to_string() }
    }
}

/// Stacktrace capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Report a second pass that does not reproduce the error as a failure
    pub fail_on_divergence: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { fail_on_divergence: true }
    }
}

/// Log filter used by front ends; `RUST_LOG` takes precedence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl RebugConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RebugConfig::from_toml_str("").unwrap();
        assert_eq!(config, RebugConfig::default());
        assert_eq!(config.capture.max_call_depth, 200);
        assert_eq!(config.render.store_module, "Rebugger");
        assert!(config.trace.fail_on_divergence);
    }

    #[test]
    fn test_partial_override() {
        let config = RebugConfig::from_toml_str("[render]\nindent = 2\n[trace]\nfail_on_divergence = false\n").unwrap();
        assert_eq!(config.render.indent, 2);
        assert_eq!(config.render.store_module, "Rebugger");
        assert!(!config.trace.fail_on_divergence);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[capture]\nhidden_prefix = \"__shadow_\"\n[logging]\nlevel = \"debug\"").unwrap();
        let config = RebugConfig::load(file.path()).unwrap();
        assert_eq!(config.capture.hidden_prefix, "__shadow_");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_errors() {
        let err = RebugConfig::load("/nonexistent/rebug.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nindent = \"wide\"").unwrap();
        let err = RebugConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.category(), ErrorCategory::Structural);
    }
}
