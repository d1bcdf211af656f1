//! Error types for schema definition and value conversion
//!
//! Error kinds:
//! - FIELD_SCHEMA_DEFINITION: a schema or one of its options is invalid
//! - FIELD_VALUE_VALIDATION: an assignment failed the field's type check
//! - FIELD_MISSING_REQUIRED: a required field is absent
//! - FIELD_UNKNOWN: strict deserialize saw wire keys with no field
//! - FIELD_CUSTOM_CODEC: a custom scalar codec misbehaved
//! - FIELD_CONVERSION: a wire value had the wrong shape for its field
//! - FIELD_UNRESOLVED_STRUCT: a struct reference names an undefined type
//! - FIELD_ARGUMENT: a caller passed unexpected arguments
//!
//! All of these are local and synchronous; nothing is retried.

use std::fmt;

use thiserror::Error;

/// Stable classification of a [`FieldError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaDefinition,
    ValueValidation,
    MissingRequiredField,
    UnknownField,
    CustomCodec,
    Conversion,
    UnresolvedStruct,
    Argument,
}

impl ErrorKind {
    /// Returns the string code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::SchemaDefinition => "FIELD_SCHEMA_DEFINITION",
            ErrorKind::ValueValidation => "FIELD_VALUE_VALIDATION",
            ErrorKind::MissingRequiredField => "FIELD_MISSING_REQUIRED",
            ErrorKind::UnknownField => "FIELD_UNKNOWN",
            ErrorKind::CustomCodec => "FIELD_CUSTOM_CODEC",
            ErrorKind::Conversion => "FIELD_CONVERSION",
            ErrorKind::UnresolvedStruct => "FIELD_UNRESOLVED_STRUCT",
            ErrorKind::Argument => "FIELD_ARGUMENT",
        }
    }

    /// Schema-time errors are fatal to the type's definition
    pub fn is_definition_time(&self) -> bool {
        matches!(self, ErrorKind::SchemaDefinition | ErrorKind::UnresolvedStruct)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Details of a rejected assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Struct type owning the field
    pub struct_name: String,
    /// Field name
    pub field: String,
    /// Expected (non-nilable) type, rendered
    pub expected: String,
    /// Offending value, rendered
    pub actual: String,
    /// Shape of the offending value
    pub actual_shape: &'static str,
    /// Message from a field's extra validation hook, if that is what failed
    pub reason: Option<String>,
    /// Best-effort `file:line` of the caller
    pub location: Option<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Can't set {}.{} to {} (instance of {}) - need a {}",
            self.struct_name, self.field, self.actual, self.actual_shape, self.expected
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        if let Some(location) = &self.location {
            write!(f, " [caller: {}]", location)?;
        }
        Ok(())
    }
}

/// Errors raised while defining schemas or converting values
#[derive(Debug, Clone, Error)]
pub enum FieldError {
    #[error("invalid definition of {struct_name}{}: {reason}", qualify(.field))]
    SchemaDefinition {
        struct_name: String,
        field: String,
        reason: String,
    },

    #[error("invalid schema file '{path}': {reason}")]
    SchemaFile { path: String, reason: String },

    #[error("{0}")]
    ValueValidation(Box<ValidationFailure>),

    #[error("{struct_name}.{field} not set for non-optional field")]
    MissingRequiredField { struct_name: String, field: String },

    #[error("unknown fields for {struct_name}: {keys:?}")]
    UnknownField {
        struct_name: String,
        keys: Vec<String>,
    },

    #[error("custom scalar '{type_name}' failed: {message}")]
    CustomCodec { type_name: String, message: String },

    #[error("cannot convert {struct_name}.{field}: expected {expected}, got {actual}")]
    Conversion {
        struct_name: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("struct type '{name}' is referenced but was never defined")]
    UnresolvedStruct { name: String },

    #[error("{0}")]
    Argument(String),
}

impl FieldError {
    pub fn schema_definition(
        struct_name: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FieldError::SchemaDefinition {
            struct_name: struct_name.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError::SchemaFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_required(struct_name: impl Into<String>, field: impl Into<String>) -> Self {
        FieldError::MissingRequiredField {
            struct_name: struct_name.into(),
            field: field.into(),
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        FieldError::Argument(message.into())
    }

    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FieldError::SchemaDefinition { .. } | FieldError::SchemaFile { .. } => {
                ErrorKind::SchemaDefinition
            }
            FieldError::ValueValidation(_) => ErrorKind::ValueValidation,
            FieldError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            FieldError::UnknownField { .. } => ErrorKind::UnknownField,
            FieldError::CustomCodec { .. } => ErrorKind::CustomCodec,
            FieldError::Conversion { .. } => ErrorKind::Conversion,
            FieldError::UnresolvedStruct { .. } => ErrorKind::UnresolvedStruct,
            FieldError::Argument(_) => ErrorKind::Argument,
        }
    }

    /// Returns the validation details if this is a validation error
    pub fn validation(&self) -> Option<&ValidationFailure> {
        match self {
            FieldError::ValueValidation(failure) => Some(failure),
            _ => None,
        }
    }
}

fn qualify(field: &str) -> String {
    if field.is_empty() {
        String::new()
    } else {
        format!(".{}", field)
    }
}

/// Result type for field operations
pub type FieldResult<T> = Result<T, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::SchemaDefinition.code(), "FIELD_SCHEMA_DEFINITION");
        assert_eq!(ErrorKind::MissingRequiredField.code(), "FIELD_MISSING_REQUIRED");
        assert_eq!(ErrorKind::UnknownField.code(), "FIELD_UNKNOWN");
        assert_eq!(ErrorKind::CustomCodec.code(), "FIELD_CUSTOM_CODEC");
    }

    #[test]
    fn test_schema_file_is_definition_kind() {
        let err = FieldError::schema_file("a.json", "bad");
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
        assert!(err.kind().is_definition_time());
    }

    #[test]
    fn test_validation_failure_display() {
        let failure = ValidationFailure {
            struct_name: "User".into(),
            field: "age".into(),
            expected: "Integer".into(),
            actual: "\"old\"".into(),
            actual_shape: "text",
            reason: None,
            location: Some("src/app.rs:10".into()),
        };
        let display = FieldError::ValueValidation(Box::new(failure)).to_string();
        assert!(display.contains("User.age"));
        assert!(display.contains("need a Integer"));
        assert!(display.contains("src/app.rs:10"));
    }

    #[test]
    fn test_unknown_field_lists_keys() {
        let err = FieldError::UnknownField {
            struct_name: "User".into(),
            keys: vec!["x".into(), "y".into()],
        };
        let display = err.to_string();
        assert!(display.contains("\"x\""));
        assert!(display.contains("\"y\""));
    }
}
