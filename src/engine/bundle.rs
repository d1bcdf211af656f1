//! Generated routine bundle
//!
//! One bundle per struct type, immutable once built. It owns the four
//! routines (serialize-strict, serialize-lenient, deserialize,
//! apply-defaults) and one setter validator per field.

use std::collections::HashSet;
use std::panic::Location;
use std::sync::Arc;

use serde::Serialize;

use super::setter::SetterValidator;
use crate::instance::Instance;
use crate::observability::{
    log_event_with_fields, ConversionMetrics, Diagnostic, DiagnosticSink, Event,
};
use crate::schema::{FieldError, FieldResult};
use crate::value::{Value, ValueMap};

pub(crate) type SerializeRoutine = Box<dyn Fn(&Instance) -> FieldResult<ValueMap> + Send + Sync>;
pub(crate) type DeserializeRoutine =
    Box<dyn Fn(&ValueMap, &mut Instance, bool) -> FieldResult<usize> + Send + Sync>;
pub(crate) type DefaultsRoutine =
    Box<dyn Fn(&mut Instance, &[bool]) -> FieldResult<usize> + Send + Sync>;

/// Per-field summary of what synthesis chose
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldExplanation {
    pub name: String,
    pub wire_key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub shape: &'static str,
    pub nilable: bool,
    pub serialize: String,
    pub deserialize: String,
    pub clone: String,
    pub default: &'static str,
    pub accepts_nil: bool,
    pub store_nil: bool,
    pub dont_store: bool,
}

/// The cached routines of one struct type
pub struct RoutineBundle {
    pub(crate) struct_name: Arc<str>,
    pub(crate) serialize_strict: SerializeRoutine,
    pub(crate) serialize_lenient: SerializeRoutine,
    pub(crate) deserialize: DeserializeRoutine,
    pub(crate) apply_defaults: DefaultsRoutine,
    pub(crate) validators: Vec<SetterValidator>,
    /// Every field's wire key, `dont_store` fields included
    pub(crate) known_wire_keys: HashSet<Arc<str>>,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    pub(crate) metrics: Arc<ConversionMetrics>,
    pub(crate) explain: Vec<FieldExplanation>,
}

impl RoutineBundle {
    pub fn struct_name(&self) -> &str {
        &self.struct_name
    }

    pub fn explain(&self) -> &[FieldExplanation] {
        &self.explain
    }

    /// Reject instances built for another struct type
    fn check_owner(&self, inst: &Instance) -> FieldResult<()> {
        if inst.type_name() != &*self.struct_name || inst.slot_count() != self.validators.len() {
            return Err(FieldError::argument(format!(
                "{} routines cannot convert a {} instance",
                self.struct_name,
                inst.type_name()
            )));
        }
        Ok(())
    }

    /// Instance to wire map. Unrecognized fields are merged last.
    pub(crate) fn serialize(&self, inst: &Instance, strict: bool) -> FieldResult<ValueMap> {
        self.check_owner(inst)?;
        self.metrics.increment_serializations();
        if strict {
            (self.serialize_strict)(inst)
        } else {
            (self.serialize_lenient)(inst)
        }
    }

    /// Populate `inst` from a wire map.
    ///
    /// Unknown keys are an error when `strict`, otherwise they become the
    /// instance's extra-fields bag. Markers and extras of any earlier
    /// deserialize are discarded first.
    pub(crate) fn deserialize(
        &self,
        input: &ValueMap,
        inst: &mut Instance,
        strict: bool,
    ) -> FieldResult<()> {
        self.check_owner(inst)?;
        self.metrics.increment_deserializations();
        inst.clear_deserialize_state();
        let found = (self.deserialize)(input, inst, strict)?;
        if found >= input.len() {
            return Ok(());
        }

        let mut extra = ValueMap::with_capacity(input.len() - found);
        for (key, value) in input.iter() {
            let known = key
                .as_text()
                .map_or(false, |k| self.known_wire_keys.contains(k));
            if !known {
                extra.insert(key.clone(), value.clone());
            }
        }
        if extra.is_empty() {
            return Ok(());
        }

        if strict {
            let keys: Vec<String> = extra
                .keys()
                .map(|k| k.as_text().map_or_else(|| k.to_string(), str::to_string))
                .collect();
            let err = FieldError::UnknownField {
                struct_name: self.struct_name.to_string(),
                keys,
            };
            log_event_with_fields(Event::UnknownFieldsRejected, &[("struct", &*self.struct_name)]);
            self.sink.report(&Diagnostic::from_error(&self.struct_name, &err));
            return Err(err);
        }

        let count = extra.len().to_string();
        log_event_with_fields(
            Event::UnknownFieldsRetained,
            &[("struct", &*self.struct_name), ("count", count.as_str())],
        );
        self.metrics.increment_extra_field_bags();
        inst.set_extra(extra);
        Ok(())
    }

    /// Fill every field not marked in `provided` from its default.
    ///
    /// Returns the number of defaults applied.
    pub(crate) fn apply_defaults(&self, inst: &mut Instance, provided: &[bool]) -> FieldResult<usize> {
        self.check_owner(inst)?;
        let applied = (self.apply_defaults)(inst, provided)?;
        self.metrics.add_defaults_applied(applied as u64);
        Ok(applied)
    }

    pub fn validator(&self, slot: usize) -> Option<&SetterValidator> {
        self.validators.get(slot)
    }

    /// Run the setter gate of `slot`, reporting failures
    pub fn check_assignment(
        &self,
        slot: usize,
        value: &Value,
        location: Option<&Location<'_>>,
    ) -> FieldResult<()> {
        let Some(validator) = self.validators.get(slot) else {
            return Err(FieldError::argument(format!(
                "{} has no field slot {}",
                self.struct_name, slot
            )));
        };
        validator.check(value, location).map_err(|err| {
            self.metrics.increment_validation_failures();
            if let Some(failure) = err.validation() {
                log_event_with_fields(
                    Event::ValidationFailed,
                    &[("struct", &*self.struct_name), ("field", failure.field.as_str())],
                );
            }
            self.sink.report(&Diagnostic::from_error(&self.struct_name, &err));
            err
        })
    }
}
