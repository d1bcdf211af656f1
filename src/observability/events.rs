//! Observable events
//!
//! Events are explicit and typed; the logger only ever sees `as_str()`.

use std::fmt;

use super::logger::Severity;

/// Observable events of the conversion engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration and loading
    /// Engine configuration loaded
    ConfigLoaded,
    /// Schema documents loaded from disk
    SchemasLoaded,

    // Registry
    /// A struct type was defined
    SchemaDefined,
    /// A routine bundle was synthesized and installed
    BundleSynthesized,
    /// A concurrent first use installed its bundle first; ours was dropped
    BundleRaceLost,

    // Conversions
    /// Strict serialize found a required field nil, suppressed by the missing marker
    RequiredMissingOnSerialize,
    /// Deserialize found a required field absent
    RequiredMissingOnDeserialize,
    /// Unknown wire keys were kept as extra fields
    UnknownFieldsRetained,
    /// Strict deserialize rejected unknown wire keys
    UnknownFieldsRejected,
    /// An assignment failed its field validator
    ValidationFailed,
    /// A custom codec failed or produced an invalid encoded value
    CodecFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::SchemaDefined => "SCHEMA_DEFINED",
            Event::BundleSynthesized => "BUNDLE_SYNTHESIZED",
            Event::BundleRaceLost => "BUNDLE_RACE_LOST",
            Event::RequiredMissingOnSerialize => "REQUIRED_MISSING_ON_SERIALIZE",
            Event::RequiredMissingOnDeserialize => "REQUIRED_MISSING_ON_DESERIALIZE",
            Event::UnknownFieldsRetained => "UNKNOWN_FIELDS_RETAINED",
            Event::UnknownFieldsRejected => "UNKNOWN_FIELDS_REJECTED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::CodecFailed => "CODEC_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BundleRaceLost | Event::UnknownFieldsRetained => Severity::Trace,
            Event::RequiredMissingOnSerialize
            | Event::RequiredMissingOnDeserialize
            | Event::UnknownFieldsRejected
            | Event::ValidationFailed => Severity::Warn,
            Event::CodecFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
