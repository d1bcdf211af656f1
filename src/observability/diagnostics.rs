//! Error and diagnostic hook
//!
//! Every hard failure raised by a generated routine, and every soft
//! degradation that is logged instead of raised, is reported to the
//! registry's [`DiagnosticSink`] as a structured [`Diagnostic`].

use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Serialize;

use super::logger::{Logger, Severity};
use crate::schema::{ErrorKind, FieldError};

/// Structured payload handed to a [`DiagnosticSink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Error code, e.g. `FIELD_MISSING_REQUIRED`
    pub kind: &'static str,
    /// Logged instead of raised
    pub soft: bool,
    pub struct_name: String,
    pub field: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub value: Option<String>,
    pub location: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, struct_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.code(),
            soft: false,
            struct_name: struct_name.into(),
            field: None,
            type_name: None,
            value: None,
            location: None,
            message: message.into(),
        }
    }

    /// Build from a raised error, filling what the error carries
    pub fn from_error(struct_name: &str, err: &FieldError) -> Self {
        let mut diag = Diagnostic::new(err.kind(), struct_name, err.to_string());
        match err {
            FieldError::ValueValidation(failure) => {
                diag.field = Some(failure.field.clone());
                diag.type_name = Some(failure.expected.clone());
                diag.value = Some(failure.actual.clone());
                diag.location = failure.location.clone();
            }
            FieldError::MissingRequiredField { field, .. }
            | FieldError::SchemaDefinition { field, .. } => {
                diag.field = Some(field.clone());
            }
            FieldError::Conversion {
                field,
                expected,
                actual,
                ..
            } => {
                diag.field = Some(field.clone());
                diag.type_name = Some(expected.clone());
                diag.value = Some(actual.clone());
            }
            FieldError::CustomCodec { type_name, .. } => {
                diag.type_name = Some(type_name.clone());
            }
            _ => {}
        }
        diag
    }

    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Receiver for diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Writes diagnostics through the structured [`Logger`]
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    log_soft: bool,
}

impl LogSink {
    pub fn new(log_soft: bool) -> Self {
        Self { log_soft }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        if diagnostic.soft && !self.log_soft {
            return;
        }
        let severity = if diagnostic.soft {
            Severity::Warn
        } else {
            Severity::Error
        };
        let mut fields = vec![
            ("struct", diagnostic.struct_name.as_str()),
            ("message", diagnostic.message.as_str()),
            ("soft", if diagnostic.soft { "true" } else { "false" }),
        ];
        if let Some(field) = &diagnostic.field {
            fields.push(("field", field.as_str()));
        }
        if let Some(type_name) = &diagnostic.type_name {
            fields.push(("type", type_name.as_str()));
        }
        if let Some(value) = &diagnostic.value {
            fields.push(("value", value.as_str()));
        }
        if let Some(location) = &diagnostic.location {
            fields.push(("location", location.as_str()));
        }
        Logger::log(severity, diagnostic.kind, &fields);
    }
}

/// Collects diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything reported so far
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain everything reported so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}
