//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status. Per-document
//! conversion failures in `convert` are not CLI errors; they are written
//! as error responses.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::schema::FieldError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// A schema file or definition was rejected
    SchemaError,
    /// `--struct` names no loaded type
    UnknownStruct,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "FIELDGEN_CLI_CONFIG_ERROR",
            Self::IoError => "FIELDGEN_CLI_IO_ERROR",
            Self::SchemaError => "FIELDGEN_CLI_SCHEMA_ERROR",
            Self::UnknownStruct => "FIELDGEN_CLI_UNKNOWN_STRUCT",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn schema_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SchemaError, msg)
    }

    pub fn unknown_struct(name: &str, known: &[String]) -> Self {
        Self::new(
            CliErrorCode::UnknownStruct,
            format!("no struct named '{}' (loaded: {})", name, known.join(", ")),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<FieldError> for CliError {
    fn from(e: FieldError) -> Self {
        Self::schema_error(format!("{}: {}", e.kind().code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
