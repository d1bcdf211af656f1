//! Struct instances
//!
//! An [`Instance`] owns one value per field slot, an optional bag of
//! unrecognized wire fields, and the set of fields that were missing at its
//! last deserialize. All conversions go through its type's routine bundle.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::registry::StructType;
use crate::schema::{FieldError, FieldResult};
use crate::value::{Value, ValueMap};

/// A value of a registered struct type
#[derive(Clone)]
pub struct Instance {
    ty: Arc<StructType>,
    values: Vec<Value>,
    extra: Option<ValueMap>,
    missing_from_deserialize: Vec<usize>,
}

impl Instance {
    /// All fields nil, no extras
    pub(crate) fn blank(ty: Arc<StructType>) -> Self {
        let values = vec![Value::Nil; ty.schema().len()];
        Self {
            ty,
            values,
            extra: None,
            missing_from_deserialize: Vec::new(),
        }
    }

    pub fn struct_type(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// True if this instance's type is `name` or inherits from it
    pub fn is_a(&self, name: &str) -> bool {
        self.ty.schema().is_a(name)
    }

    /// Current value of a field, `None` for an unknown name
    pub fn get(&self, name: &str) -> Option<&Value> {
        let field = self.ty.schema().field(name)?;
        self.values.get(field.slot())
    }

    /// Assign a field through its setter validator
    #[track_caller]
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> FieldResult<()> {
        let value = value.into();
        let location = Location::caller();
        let field = self.ty.schema().field(name).ok_or_else(|| {
            FieldError::argument(format!("{} has no field '{}'", self.ty.name(), name))
        })?;
        let slot = field.slot();
        self.ty
            .bundle()
            .check_assignment(slot, &value, Some(location))?;
        if let Some(observer) = self.ty.schema().observer() {
            observer.on_write(self.ty.name(), name, &value);
        }
        self.values[slot] = value;
        Ok(())
    }

    /// Convert to a wire map
    pub fn serialize(&self, strict: bool) -> FieldResult<ValueMap> {
        self.ty.bundle().serialize(self, strict)
    }

    /// Copy with `changes` applied.
    ///
    /// `changes` is given in wire form: it is merged over the strict
    /// serialization of `self` and deserialized into a new instance. Nested
    /// map keys are normalized to text first. `self` is never modified.
    pub fn with(&self, changes: &ValueMap) -> FieldResult<Instance> {
        let changes = normalize_keys(changes)?;
        let mut wire = self.serialize(true)?;
        wire.merge(&changes);
        let updated = self.ty.from_map(&wire, false)?;

        let empty = ValueMap::new();
        let before = self.extra.as_ref().unwrap_or(&empty);
        let after = updated.extra.as_ref().unwrap_or(&empty);
        let unexpected: Vec<String> = after
            .iter()
            .filter(|(k, v)| {
                let allowed = k
                    .as_text()
                    .map_or(false, |key| changes.contains_key(key) && before.contains_key(key));
                before.get_value(k) != Some(*v) && !allowed
            })
            .map(|(k, _)| k.as_text().map_or_else(|| k.to_string(), str::to_string))
            .collect();
        if !unexpected.is_empty() {
            return Err(FieldError::argument(format!(
                "unexpected arguments for {}: {:?}",
                self.ty.name(),
                unexpected
            )));
        }
        Ok(updated)
    }

    /// Wire fields that matched no field at the last deserialize
    pub fn extra_fields(&self) -> Option<&ValueMap> {
        self.extra.as_ref()
    }

    /// True if `name` was absent at the last deserialize and the field
    /// tolerates that once
    pub fn was_missing_from_deserialize(&self, name: &str) -> bool {
        self.ty
            .schema()
            .field(name)
            .map_or(false, |f| self.is_marked_missing(f.slot()))
    }

    /// Copy sharing nothing mutable with `self`
    pub fn deep_clone(&self) -> Instance {
        Instance {
            ty: Arc::clone(&self.ty),
            values: self.values.iter().map(Value::deep_clone).collect(),
            extra: self.extra.as_ref().map(ValueMap::deep_clone),
            missing_from_deserialize: self.missing_from_deserialize.clone(),
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.values.len()
    }

    /// Forget markers and extras from an earlier deserialize
    pub(crate) fn clear_deserialize_state(&mut self) {
        self.missing_from_deserialize.clear();
        self.extra = None;
    }

    pub(crate) fn slot(&self, slot: usize) -> &Value {
        &self.values[slot]
    }

    pub(crate) fn set_slot(&mut self, slot: usize, value: Value) {
        self.values[slot] = value;
    }

    pub(crate) fn mark_missing(&mut self, slot: usize) {
        if !self.missing_from_deserialize.contains(&slot) {
            self.missing_from_deserialize.push(slot);
        }
    }

    pub(crate) fn is_marked_missing(&self, slot: usize) -> bool {
        self.missing_from_deserialize.contains(&slot)
    }

    pub(crate) fn set_extra(&mut self, extra: ValueMap) {
        self.extra = Some(extra);
    }
}

/// Text-normalize map keys recursively; nested instances become wire maps.
fn normalize_keys(map: &ValueMap) -> FieldResult<ValueMap> {
    let mut out = ValueMap::with_capacity(map.len());
    for (key, value) in map.iter() {
        let key = match key {
            Value::Text(_) => key.clone(),
            Value::Int(i) => Value::text(i.to_string()),
            Value::Float(x) => Value::text(x.to_string()),
            Value::Bool(b) => Value::text(b.to_string()),
            other => Value::text(other.to_string()),
        };
        out.insert(key, normalize_value(value)?);
    }
    Ok(out)
}

fn normalize_value(value: &Value) -> FieldResult<Value> {
    Ok(match value {
        Value::Map(map) => Value::Map(normalize_keys(map)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(normalize_value)
                .collect::<FieldResult<Vec<_>>>()?,
        ),
        Value::Struct(inst) => Value::Map(inst.serialize(true)?),
        other => other.clone(),
    })
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        let no_extra = |i: &Instance| i.extra.as_ref().map_or(true, ValueMap::is_empty);
        self.type_name() == other.type_name()
            && self.values == other.values
            && (self.extra == other.extra || (no_extra(self) && no_extra(other)))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (field, value) in self.ty.schema().fields().iter().zip(&self.values) {
            s.field(field.name(), value);
        }
        if let Some(extra) = &self.extra {
            s.field("extra", extra);
        }
        s.finish()
    }
}
