//! Custom scalar codecs
//!
//! A codec converts between an in-memory value and a wire scalar:
//! - `encode(value) -> scalar`
//! - `decode(scalar) -> value`
//! - `is_valid_encoded(scalar) -> bool`
//!
//! Built-ins: RFC 3339 timestamps (chrono), UUIDs, and closed text enums.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::value::{CustomValue, Value};

/// Conversion contract for a custom scalar type
pub trait ScalarCodec: fmt::Debug + Send + Sync {
    /// Type name used in error messages and schema files
    fn name(&self) -> &str;

    /// Returns true if `value` is a valid in-memory value of this type
    fn accepts(&self, value: &Value) -> bool;

    /// Convert an in-memory value to its wire form
    fn encode(&self, value: &Value) -> Result<Value, String>;

    /// Convert a wire value back to its in-memory form
    fn decode(&self, encoded: &Value) -> Result<Value, String>;

    /// Post-encode shape check
    fn is_valid_encoded(&self, encoded: &Value) -> bool {
        encoded.is_wire()
    }

    /// Immutable values may be shared between instances instead of cloned
    fn is_immutable(&self) -> bool {
        true
    }
}

/// UTC timestamps, encoded as RFC 3339 text with microsecond precision
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec;

impl TimestampCodec {
    pub fn value(ts: DateTime<Utc>) -> Value {
        Value::Custom(CustomValue::new(ts))
    }
}

impl ScalarCodec for TimestampCodec {
    fn name(&self) -> &str {
        "Timestamp"
    }

    fn accepts(&self, value: &Value) -> bool {
        value.as_custom().map_or(false, |c| c.is::<DateTime<Utc>>())
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        let ts = value
            .as_custom()
            .and_then(|c| c.downcast_ref::<DateTime<Utc>>())
            .ok_or_else(|| format!("expected a timestamp, got {}", value.shape_name()))?;
        Ok(Value::text(ts.to_rfc3339_opts(SecondsFormat::Micros, true)))
    }

    fn decode(&self, encoded: &Value) -> Result<Value, String> {
        let text = encoded
            .as_text()
            .ok_or_else(|| format!("expected RFC 3339 text, got {}", encoded.shape_name()))?;
        let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| e.to_string())?;
        Ok(Self::value(parsed.with_timezone(&Utc)))
    }

    fn is_valid_encoded(&self, encoded: &Value) -> bool {
        matches!(encoded, Value::Text(_))
    }
}

/// UUIDs, encoded as lowercase hyphenated text
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl UuidCodec {
    pub fn value(id: Uuid) -> Value {
        Value::Custom(CustomValue::new(id))
    }
}

impl ScalarCodec for UuidCodec {
    fn name(&self) -> &str {
        "Uuid"
    }

    fn accepts(&self, value: &Value) -> bool {
        value.as_custom().map_or(false, |c| c.is::<Uuid>())
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        let id = value
            .as_custom()
            .and_then(|c| c.downcast_ref::<Uuid>())
            .ok_or_else(|| format!("expected a uuid, got {}", value.shape_name()))?;
        Ok(Value::text(id.hyphenated().to_string()))
    }

    fn decode(&self, encoded: &Value) -> Result<Value, String> {
        let text = encoded
            .as_text()
            .ok_or_else(|| format!("expected uuid text, got {}", encoded.shape_name()))?;
        Uuid::parse_str(text)
            .map(Self::value)
            .map_err(|e| e.to_string())
    }

    fn is_valid_encoded(&self, encoded: &Value) -> bool {
        matches!(encoded, Value::Text(_))
    }
}

/// A closed set of text variants, stored and encoded as text
#[derive(Debug, Clone)]
pub struct EnumCodec {
    name: String,
    variants: Vec<Arc<str>>,
}

impl EnumCodec {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(|v| Arc::from(v.as_ref())).collect(),
        }
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.as_ref())
    }

    fn is_variant(&self, text: &str) -> bool {
        self.variants.iter().any(|v| v.as_ref() == text)
    }
}

impl ScalarCodec for EnumCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, value: &Value) -> bool {
        value.as_text().map_or(false, |t| self.is_variant(t))
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        if self.accepts(value) {
            Ok(value.clone())
        } else {
            Err(format!("{} is not a variant of {}", value, self.name))
        }
    }

    fn decode(&self, encoded: &Value) -> Result<Value, String> {
        match encoded.as_text() {
            Some(text) if self.is_variant(text) => Ok(encoded.clone()),
            _ => Err(format!("{} is not a variant of {}", encoded, self.name)),
        }
    }
}

/// Named codecs available to schema files
#[derive(Debug, Clone)]
pub struct CodecTable {
    codecs: HashMap<String, Arc<dyn ScalarCodec>>,
}

impl CodecTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Table with the built-in `timestamp` and `uuid` codecs
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register("timestamp", Arc::new(TimestampCodec));
        table.register("uuid", Arc::new(UuidCodec));
        table
    }

    pub fn register(&mut self, name: impl Into<String>, codec: Arc<dyn ScalarCodec>) {
        self.codecs.insert(name.into(), codec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScalarCodec>> {
        self.codecs.get(name).cloned()
    }
}

impl Default for CodecTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}
