//! Registered struct types
//!
//! A [`StructType`] pairs an immutable schema with its routine bundle.
//! The bundle is synthesized on first use and installed atomically; racing
//! first uses may each build one, and the losers' copies are dropped.

use std::panic::Location;
use std::sync::{Arc, OnceLock, Weak};

use crate::engine::{synthesize, FieldExplanation, RoutineBundle, StructResolver};
use crate::instance::Instance;
use crate::observability::{log_event_with_fields, ConversionMetrics, DiagnosticSink, Event};
use crate::schema::{FieldError, FieldResult, StructSchema};
use crate::value::{Value, ValueMap};

use super::SchemaRegistry;

/// A struct type defined in a [`SchemaRegistry`]
pub struct StructType {
    schema: StructSchema,
    registry: Weak<SchemaRegistry>,
    sink: Arc<dyn DiagnosticSink>,
    metrics: Arc<ConversionMetrics>,
    bundle: OnceLock<Arc<RoutineBundle>>,
}

impl StructType {
    pub(crate) fn new(
        schema: StructSchema,
        registry: Weak<SchemaRegistry>,
        sink: Arc<dyn DiagnosticSink>,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            schema,
            registry,
            sink,
            metrics,
            bundle: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &StructSchema {
        &self.schema
    }

    /// True once the bundle has been installed
    pub fn is_synthesized(&self) -> bool {
        self.bundle.get().is_some()
    }

    /// The routine bundle, synthesized on first call
    pub fn bundle(&self) -> &Arc<RoutineBundle> {
        if let Some(bundle) = self.bundle.get() {
            return bundle;
        }

        let candidate = Arc::new(synthesize(
            &self.schema,
            StructResolver::new(self.registry.clone()),
            Arc::clone(&self.sink),
            Arc::clone(&self.metrics),
        ));
        let installed = self.bundle.get_or_init(|| Arc::clone(&candidate));

        let fields = self.schema.len().to_string();
        if Arc::ptr_eq(installed, &candidate) {
            self.metrics.increment_bundles_synthesized();
            log_event_with_fields(
                Event::BundleSynthesized,
                &[("struct", self.name()), ("fields", fields.as_str())],
            );
        } else {
            self.metrics.increment_bundle_races_lost();
            log_event_with_fields(Event::BundleRaceLost, &[("struct", self.name())]);
        }
        installed
    }

    /// Deserialize a wire map into a new instance
    pub fn from_map(self: &Arc<Self>, map: &ValueMap, strict: bool) -> FieldResult<Instance> {
        let mut inst = Instance::blank(Arc::clone(self));
        self.bundle().deserialize(map, &mut inst, strict)?;
        Ok(inst)
    }

    /// Deserialize a JSON object into a new instance
    pub fn from_json(self: &Arc<Self>, json: &serde_json::Value, strict: bool) -> FieldResult<Instance> {
        match json {
            serde_json::Value::Object(obj) => self.from_map(&ValueMap::from_json_object(obj), strict),
            other => Err(FieldError::argument(format!(
                "{} expects a JSON object, got {}",
                self.name(),
                json_kind(other)
            ))),
        }
    }

    /// Build an instance from field-name/value pairs.
    ///
    /// Provided values pass through their setters; every other field gets
    /// its default. Unknown names are an argument error.
    #[track_caller]
    pub fn construct<I, K, V>(self: &Arc<Self>, props: I) -> FieldResult<Instance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let location = Location::caller();
        let bundle = self.bundle();
        let mut inst = Instance::blank(Arc::clone(self));
        let mut provided = vec![false; self.schema.len()];

        for (name, value) in props {
            let name = name.as_ref();
            let field = self.schema.field(name).ok_or_else(|| {
                FieldError::argument(format!("{} has no field '{}'", self.name(), name))
            })?;
            let value = value.into();
            bundle.check_assignment(field.slot(), &value, Some(location))?;
            if let Some(observer) = self.schema.observer() {
                observer.on_write(self.name(), name, &value);
            }
            provided[field.slot()] = true;
            inst.set_slot(field.slot(), value);
        }

        bundle.apply_defaults(&mut inst, &provided)?;
        Ok(inst)
    }

    /// What synthesis chose for each field
    pub fn explain(&self) -> &[FieldExplanation] {
        self.bundle().explain()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl std::fmt::Debug for StructType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name())
            .field("fields", &self.schema.len())
            .field("synthesized", &self.is_synthesized())
            .finish()
    }
}
