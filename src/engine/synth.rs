//! Closure synthesizer
//!
//! Turns selected strategies into composed closures, once per struct type:
//! - each strategy compiles to a [`Transform`] (`None` for identity)
//! - each field compiles to one step per routine, with its nil and
//!   missing-value policy decided here rather than per call
//! - the steps are folded into the four routines of a [`RoutineBundle`]
//!
//! Nothing in a generated routine inspects a type descriptor again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};

use thiserror::Error;

use super::bundle::{
    DefaultsRoutine, DeserializeRoutine, FieldExplanation, RoutineBundle, SerializeRoutine,
};
use super::defaults::DefaultPolicy;
use super::setter::SetterValidator;
use super::shape::classify;
use super::strategy::{Container, Elementwise, FieldStrategies, Operation, Strategy};
use crate::instance::Instance;
use crate::observability::{
    log_event_with_fields, ConversionMetrics, Diagnostic, DiagnosticSink, Event,
};
use crate::registry::{SchemaRegistry, StructType};
use crate::schema::{FieldError, FieldObserver, FieldResult, FieldSchema, StructRef, StructSchema};
use crate::value::{dedup_values, Value, ValueMap};

/// A compiled conversion of one value position; the flag is `strict`
pub type Transform = Arc<dyn Fn(&Value, bool) -> Result<Value, TransformError> + Send + Sync>;

/// Failure inside a transform, before field context is attached
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("expected {expected}, got {actual}")]
    Shape {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{codec}: {message}")]
    Codec { codec: String, message: String },

    #[error("{0}")]
    Nested(FieldError),
}

fn shape_error(expected: &'static str, actual: &Value) -> TransformError {
    TransformError::Shape {
        expected,
        actual: actual.shape_name(),
    }
}

// ════════════════════════════════════════════════════════════════
//  Struct references
// ════════════════════════════════════════════════════════════════

/// Resolves struct names at call time
#[derive(Clone)]
pub(crate) struct StructResolver {
    registry: Weak<SchemaRegistry>,
}

impl StructResolver {
    pub(crate) fn new(registry: Weak<SchemaRegistry>) -> Self {
        Self { registry }
    }

    fn resolve(&self, name: &str) -> FieldResult<Arc<StructType>> {
        match self.registry.upgrade() {
            Some(registry) => registry.resolve(name),
            None => Err(FieldError::UnresolvedStruct {
                name: name.to_string(),
            }),
        }
    }
}

/// A struct reference resolved on first use and cached
struct LazyStruct {
    target: StructRef,
    resolver: StructResolver,
    cached: OnceLock<Weak<StructType>>,
}

impl LazyStruct {
    fn get(&self) -> Result<Arc<StructType>, TransformError> {
        if let Some(ty) = self.cached.get().and_then(Weak::upgrade) {
            return Ok(ty);
        }
        let ty = self
            .resolver
            .resolve(self.target.name())
            .map_err(TransformError::Nested)?;
        let _ = self.cached.set(Arc::downgrade(&ty));
        Ok(ty)
    }
}

// ════════════════════════════════════════════════════════════════
//  Strategy compilation
// ════════════════════════════════════════════════════════════════

/// Compile a strategy for `op`. Identity compiles to `None`.
pub(crate) fn compile(
    strategy: &Strategy,
    op: Operation,
    resolver: &StructResolver,
) -> Option<Transform> {
    let transform: Transform = match strategy {
        Strategy::Identity => return None,
        Strategy::WidenFloat => Arc::new(|v, _| {
            Ok(match v {
                Value::Int(i) => Value::Float(*i as f64),
                other => other.clone(),
            })
        }),
        Strategy::ShallowCopy(container) => shallow_copy(*container, op),
        Strategy::Elementwise(inner) => match inner.as_ref() {
            Elementwise::Sequence { container, element } => {
                let element = compile(element, op, resolver).unwrap_or_else(identity);
                sequence_map(*container, op, element)
            }
            Elementwise::Mapping { key, value } => {
                let key_type = match key {
                    Strategy::DelegateToCodec(codec) => codec.name().to_string(),
                    other => other.describe(),
                };
                let key = compile(key, op, resolver).unwrap_or_else(identity);
                let value = compile(value, op, resolver).unwrap_or_else(identity);
                mapping_map(op, key_type, key, value)
            }
        },
        Strategy::DelegateToStruct(target) => {
            let lazy = LazyStruct {
                target: target.clone(),
                resolver: resolver.clone(),
                cached: OnceLock::new(),
            };
            match op {
                Operation::Serialize => Arc::new(move |v, strict| {
                    let inst = v.as_struct().ok_or_else(|| shape_error("struct", v))?;
                    inst.serialize(strict)
                        .map(Value::Map)
                        .map_err(TransformError::Nested)
                }),
                Operation::Deserialize => Arc::new(move |v, strict| {
                    let map = v.as_map().ok_or_else(|| shape_error("map", v))?;
                    let ty = lazy.get()?;
                    ty.from_map(map, strict)
                        .map(Value::from)
                        .map_err(TransformError::Nested)
                }),
                Operation::Clone => Arc::new(|v, _| Ok(v.deep_clone())),
            }
        }
        Strategy::DelegateToCodec(codec) => {
            let codec = Arc::clone(codec);
            match op {
                Operation::Serialize => Arc::new(move |v, _| {
                    let encoded = codec.encode(v).map_err(|message| TransformError::Codec {
                        codec: codec.name().to_string(),
                        message,
                    })?;
                    if !codec.is_valid_encoded(&encoded) {
                        return Err(TransformError::Codec {
                            codec: codec.name().to_string(),
                            message: format!(
                                "encoded to an invalid {} value",
                                encoded.shape_name()
                            ),
                        });
                    }
                    Ok(encoded)
                }),
                Operation::Deserialize => Arc::new(move |v, _| {
                    codec.decode(v).map_err(|message| TransformError::Codec {
                        codec: codec.name().to_string(),
                        message,
                    })
                }),
                Operation::Clone => Arc::new(|v, _| Ok(v.deep_clone())),
            }
        }
        Strategy::DeepClone => Arc::new(|v, _| Ok(v.deep_clone())),
        Strategy::NilGuard(inner) => {
            let inner = compile(inner, op, resolver)?;
            Arc::new(move |v, strict| if v.is_nil() { Ok(Value::Nil) } else { inner(v, strict) })
        }
    };
    Some(transform)
}

fn identity() -> Transform {
    Arc::new(|v, _| Ok(v.clone()))
}

fn shallow_copy(container: Container, op: Operation) -> Transform {
    match (container, op) {
        (Container::Array, _) => Arc::new(|v, _| match v {
            Value::Array(items) => Ok(Value::Array(items.clone())),
            other => Err(shape_error("array", other)),
        }),
        (Container::Set, Operation::Serialize) => Arc::new(|v, _| match v {
            Value::Set(items) => Ok(Value::Array(items.clone())),
            other => Err(shape_error("set", other)),
        }),
        (Container::Set, Operation::Deserialize) => Arc::new(|v, _| match v {
            Value::Array(items) | Value::Set(items) => Ok(Value::set_of(items.iter().cloned())),
            other => Err(shape_error("array", other)),
        }),
        (Container::Set, Operation::Clone) => Arc::new(|v, _| match v {
            Value::Set(items) => Ok(Value::Set(items.clone())),
            other => Err(shape_error("set", other)),
        }),
        (Container::Mapping, _) => Arc::new(|v, _| match v {
            Value::Map(map) => Ok(Value::Map(map.clone())),
            other => Err(shape_error("map", other)),
        }),
    }
}

fn sequence_map(container: Container, op: Operation, element: Transform) -> Transform {
    Arc::new(move |v, strict| {
        let items = match (container, op, v) {
            (Container::Array, _, Value::Array(items)) => items,
            (Container::Set, Operation::Deserialize, Value::Array(items)) => items,
            (Container::Set, _, Value::Set(items)) => items,
            (Container::Array, _, other) => return Err(shape_error("array", other)),
            (Container::Set, Operation::Deserialize, other) => {
                return Err(shape_error("array", other))
            }
            (Container::Set, _, other) => return Err(shape_error("set", other)),
            (Container::Mapping, _, other) => return Err(shape_error("array", other)),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(element(item, strict)?);
        }
        if (container, op) == (Container::Set, Operation::Deserialize) {
            out = dedup_values(out);
        }
        Ok(match (container, op) {
            (Container::Set, Operation::Serialize) | (Container::Array, _) => Value::Array(out),
            (Container::Set, _) => Value::Set(out),
            (Container::Mapping, _) => Value::Array(out),
        })
    })
}

/// Keys that convert to the same value are an error, never a silent overwrite.
fn mapping_map(op: Operation, key_type: String, key: Transform, value: Transform) -> Transform {
    Arc::new(move |v, strict| {
        let map = v.as_map().ok_or_else(|| shape_error("map", v))?;
        let mut out = ValueMap::with_capacity(map.len());
        for (k, val) in map.iter() {
            let converted = key(k, strict)?;
            if op == Operation::Serialize && !matches!(converted, Value::Text(_)) {
                return Err(shape_error("text key", &converted));
            }
            if out.get_value(&converted).is_some() {
                return Err(TransformError::Codec {
                    codec: key_type.clone(),
                    message: format!("key {} collides with another key as {}", k, converted),
                });
            }
            out.insert(converted, value(val, strict)?);
        }
        Ok(Value::Map(out))
    })
}

// ════════════════════════════════════════════════════════════════
//  Per-field steps
// ════════════════════════════════════════════════════════════════

/// Everything a field's steps need at call time
struct FieldContext {
    struct_name: Arc<str>,
    field: Arc<str>,
    slot: usize,
    wire_key: Arc<str>,
    type_name: String,
    observer: Option<Arc<dyn FieldObserver>>,
    sink: Arc<dyn DiagnosticSink>,
    metrics: Arc<ConversionMetrics>,
}

impl FieldContext {
    fn observe_read(&self, value: &Value) {
        if let Some(observer) = &self.observer {
            observer.on_read(&self.struct_name, &self.field, value);
        }
    }

    fn observe_write(&self, value: &Value) {
        if let Some(observer) = &self.observer {
            observer.on_write(&self.struct_name, &self.field, value);
        }
    }

    fn log(&self, event: Event) {
        log_event_with_fields(event, &[("struct", &*self.struct_name), ("field", &*self.field)]);
    }

    /// Attach field context; report everything except nested failures,
    /// which were reported where they happened
    fn fail(&self, err: TransformError) -> FieldError {
        let err = match err {
            TransformError::Nested(inner) => return inner,
            TransformError::Shape { expected, actual } => FieldError::Conversion {
                struct_name: self.struct_name.to_string(),
                field: self.field.to_string(),
                expected: format!("{} for {}", expected, self.type_name),
                actual: actual.to_string(),
            },
            TransformError::Codec { codec, message } => {
                self.log(Event::CodecFailed);
                FieldError::CustomCodec {
                    type_name: codec,
                    message,
                }
            }
        };
        self.sink
            .report(&Diagnostic::from_error(&self.struct_name, &err).field(&*self.field));
        err
    }

    fn missing(&self) -> FieldError {
        FieldError::missing_required(&*self.struct_name, &*self.field)
    }

    fn report_missing(&self, err: &FieldError, soft: bool) {
        let mut diag = Diagnostic::from_error(&self.struct_name, err).type_name(&self.type_name);
        if soft {
            diag = diag.soft();
        }
        self.sink.report(&diag);
    }
}

type SerializeStep = Box<dyn Fn(&Instance, &mut ValueMap) -> FieldResult<()> + Send + Sync>;
type DeserializeStep = Box<dyn Fn(Option<&Value>, &mut Instance, bool) -> FieldResult<()> + Send + Sync>;
type DefaultStep = Box<dyn Fn(&mut Instance) -> FieldResult<bool> + Send + Sync>;

/// What a serialize step does with a nil value
enum SerializeNil {
    Omit,
    StoreNil,
    /// Raise, unless the instance carries the missing marker
    Required { store_nil: bool },
}

/// What a deserialize step does with an absent or nil value
enum MissingPolicy {
    /// Record the missing marker, store nil
    MarkAndNil,
    Nil,
    Default(DefaultPolicy),
    Required,
}

fn serialize_step(
    ctx: &Arc<FieldContext>,
    transform: Option<Transform>,
    nil: SerializeNil,
    strict: bool,
) -> SerializeStep {
    let ctx = Arc::clone(ctx);
    Box::new(move |inst, out| {
        let value = inst.slot(ctx.slot);
        ctx.observe_read(value);
        if value.is_nil() {
            let store = match &nil {
                SerializeNil::Omit => false,
                SerializeNil::StoreNil => true,
                SerializeNil::Required { store_nil } => {
                    let err = ctx.missing();
                    if !inst.is_marked_missing(ctx.slot) {
                        ctx.report_missing(&err, false);
                        return Err(err);
                    }
                    ctx.metrics.increment_suppressed_missing();
                    ctx.log(Event::RequiredMissingOnSerialize);
                    ctx.report_missing(&err, true);
                    *store_nil
                }
            };
            if store {
                out.insert(Value::Text(Arc::clone(&ctx.wire_key)), Value::Nil);
            }
            return Ok(());
        }
        let encoded = match &transform {
            Some(t) => t(value, strict).map_err(|e| ctx.fail(e))?,
            None => value.clone(),
        };
        out.insert(Value::Text(Arc::clone(&ctx.wire_key)), encoded);
        Ok(())
    })
}

fn deserialize_step(
    ctx: &Arc<FieldContext>,
    transform: Option<Transform>,
    missing: MissingPolicy,
    validator: SetterValidator,
) -> DeserializeStep {
    let ctx = Arc::clone(ctx);
    Box::new(move |input, inst, strict| {
        if let Some(value) = input.filter(|v| !v.is_nil()) {
            let decoded = match &transform {
                Some(t) => t(value, strict).map_err(|e| ctx.fail(e))?,
                None => value.clone(),
            };
            ctx.observe_write(&decoded);
            inst.set_slot(ctx.slot, decoded);
            return Ok(());
        }
        let value = match &missing {
            MissingPolicy::MarkAndNil => {
                inst.mark_missing(ctx.slot);
                Value::Nil
            }
            MissingPolicy::Nil => Value::Nil,
            MissingPolicy::Default(policy) => policy.materialize(&validator)?.unwrap_or(Value::Nil),
            MissingPolicy::Required => {
                let err = ctx.missing();
                ctx.log(Event::RequiredMissingOnDeserialize);
                if strict {
                    ctx.report_missing(&err, false);
                    return Err(err);
                }
                ctx.report_missing(&err, true);
                Value::Nil
            }
        };
        ctx.observe_write(&value);
        inst.set_slot(ctx.slot, value);
        Ok(())
    })
}

/// Deserialize step of a `dont_store` field: input is never consulted
fn unstored_step(ctx: &Arc<FieldContext>, policy: DefaultPolicy, validator: SetterValidator) -> DeserializeStep {
    let ctx = Arc::clone(ctx);
    Box::new(move |_, inst, _| {
        let value = policy.materialize(&validator)?.unwrap_or(Value::Nil);
        ctx.observe_write(&value);
        inst.set_slot(ctx.slot, value);
        Ok(())
    })
}

fn default_step(ctx: &Arc<FieldContext>, policy: DefaultPolicy, validator: SetterValidator) -> DefaultStep {
    let ctx = Arc::clone(ctx);
    Box::new(move |inst| match policy.materialize(&validator)? {
        Some(value) => {
            ctx.observe_write(&value);
            inst.set_slot(ctx.slot, value);
            Ok(true)
        }
        None if validator.accepts_nil() => Ok(false),
        None => Err(ctx.missing()),
    })
}

fn missing_policy(field: &FieldSchema, default: &DefaultPolicy) -> MissingPolicy {
    if field.is_nilable() {
        if field.raise_on_nil_write() {
            MissingPolicy::MarkAndNil
        } else {
            MissingPolicy::Nil
        }
    } else if default.has_default() {
        MissingPolicy::Default(default.clone())
    } else {
        MissingPolicy::Required
    }
}

fn serialize_nil(field: &FieldSchema, validator: &SetterValidator, strict: bool) -> SerializeNil {
    if strict && !validator.accepts_nil() {
        SerializeNil::Required {
            store_nil: field.store_nil(),
        }
    } else if field.store_nil() {
        SerializeNil::StoreNil
    } else {
        SerializeNil::Omit
    }
}

// ════════════════════════════════════════════════════════════════
//  Bundle synthesis
// ════════════════════════════════════════════════════════════════

/// Build the routine bundle of one struct type.
pub(crate) fn synthesize(
    schema: &StructSchema,
    resolver: StructResolver,
    sink: Arc<dyn DiagnosticSink>,
    metrics: Arc<ConversionMetrics>,
) -> RoutineBundle {
    let struct_name: Arc<str> = Arc::from(schema.name());
    let count = schema.len();

    let mut serialize_strict = Vec::with_capacity(count);
    let mut serialize_lenient = Vec::with_capacity(count);
    let mut deserialize_steps = Vec::with_capacity(count);
    let mut default_steps = Vec::with_capacity(count);
    let mut validators = Vec::with_capacity(count);
    let mut explain = Vec::with_capacity(count);
    let mut index: HashMap<Arc<str>, usize> = HashMap::with_capacity(count);
    let mut known_wire_keys = HashSet::with_capacity(count);

    for field in schema.fields() {
        let shape = classify(field.ty());
        let strategies = FieldStrategies::select(&shape);
        let validator = SetterValidator::build(schema.name(), field);
        let ctx = Arc::new(FieldContext {
            struct_name: Arc::clone(&struct_name),
            field: Arc::clone(&field.name),
            slot: field.slot(),
            wire_key: Arc::clone(&field.wire_key),
            type_name: field.ty().type_name(),
            observer: schema.observer().cloned(),
            sink: Arc::clone(&sink),
            metrics: Arc::clone(&metrics),
        });

        let encode = compile(&strategies.serialize, Operation::Serialize, &resolver);
        let decode = compile(&strategies.deserialize, Operation::Deserialize, &resolver);
        let copy = compile(&strategies.clone, Operation::Clone, &resolver);
        let default = DefaultPolicy::classify(field.default_spec(), copy);

        known_wire_keys.insert(Arc::clone(&field.wire_key));
        if field.dont_store() {
            deserialize_steps.push(unstored_step(&ctx, default.clone(), validator.clone()));
        } else {
            serialize_strict.push(serialize_step(
                &ctx,
                encode.clone(),
                serialize_nil(field, &validator, true),
                true,
            ));
            serialize_lenient.push(serialize_step(
                &ctx,
                encode,
                serialize_nil(field, &validator, false),
                false,
            ));
            index.insert(Arc::clone(&field.wire_key), deserialize_steps.len());
            deserialize_steps.push(deserialize_step(
                &ctx,
                decode,
                missing_policy(field, &default),
                validator.clone(),
            ));
        }

        explain.push(FieldExplanation {
            name: field.name().to_string(),
            wire_key: field.wire_key().to_string(),
            type_name: field.ty().type_name(),
            shape: shape.tag(),
            nilable: shape.nilable,
            serialize: strategies.serialize.describe(),
            deserialize: strategies.deserialize.describe(),
            clone: strategies.clone.describe(),
            default: default.kind_name(),
            accepts_nil: validator.accepts_nil(),
            store_nil: field.store_nil(),
            dont_store: field.dont_store(),
        });
        default_steps.push(default_step(&ctx, default, validator.clone()));
        validators.push(validator);
    }

    RoutineBundle {
        struct_name,
        serialize_strict: serialize_routine(serialize_strict),
        serialize_lenient: serialize_routine(serialize_lenient),
        deserialize: deserialize_routine(deserialize_steps, index),
        apply_defaults: defaults_routine(default_steps),
        validators,
        known_wire_keys,
        sink,
        metrics,
        explain,
    }
}

fn serialize_routine(steps: Vec<SerializeStep>) -> SerializeRoutine {
    Box::new(move |inst| {
        let mut out = ValueMap::with_capacity(steps.len());
        for step in &steps {
            step(inst, &mut out)?;
        }
        if let Some(extra) = inst.extra_fields() {
            out.merge(extra);
        }
        Ok(out)
    })
}

fn deserialize_routine(steps: Vec<DeserializeStep>, index: HashMap<Arc<str>, usize>) -> DeserializeRoutine {
    Box::new(move |input, inst, strict| {
        let mut slots: Vec<Option<&Value>> = vec![None; steps.len()];
        let mut found = 0;
        for (key, value) in input.iter() {
            if let Some(&pos) = key.as_text().and_then(|k| index.get(k)) {
                if slots[pos].is_none() {
                    found += 1;
                }
                slots[pos] = Some(value);
            }
        }
        for (step, value) in steps.iter().zip(slots) {
            step(value, inst, strict)?;
        }
        Ok(found)
    })
}

fn defaults_routine(steps: Vec<DefaultStep>) -> DefaultsRoutine {
    Box::new(move |inst, provided| {
        let mut applied = 0;
        for (slot, step) in steps.iter().enumerate() {
            if provided.get(slot).copied().unwrap_or(false) {
                continue;
            }
            if step(inst)? {
                applied += 1;
            }
        }
        Ok(applied)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::select;
    use crate::schema::{EnumCodec, ScalarCodec, TypeDescriptor};

    fn compiled(ty: TypeDescriptor, op: Operation) -> Option<Transform> {
        let strategy = select(&classify(&ty), op);
        compile(&strategy, op, &StructResolver::new(Weak::new()))
    }

    #[test]
    fn test_identity_compiles_to_nothing() {
        assert!(compiled(TypeDescriptor::integer(), Operation::Serialize).is_none());
        assert!(compiled(TypeDescriptor::text(), Operation::Deserialize).is_none());
    }

    #[test]
    fn test_widen_float() {
        let t = compiled(TypeDescriptor::float(), Operation::Deserialize).unwrap();
        assert_eq!(t(&Value::Int(2), true).unwrap(), Value::Float(2.0));
        assert_eq!(t(&Value::Float(2.5), true).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_set_round_trips_through_array() {
        let ty = TypeDescriptor::set(TypeDescriptor::integer());
        let de = compiled(ty.clone(), Operation::Deserialize).unwrap();
        let ser = compiled(ty, Operation::Serialize).unwrap();
        let wire = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        let set = de(&wire, true).unwrap();
        assert_eq!(set, Value::set_of(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(ser(&set, true).unwrap(), Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_shape_mismatch() {
        let de = compiled(TypeDescriptor::array(TypeDescriptor::integer()), Operation::Deserialize).unwrap();
        let err = de(&Value::Int(3), true).unwrap_err();
        assert!(matches!(err, TransformError::Shape { expected: "array", actual: "integer" }));
    }

    #[test]
    fn test_nested_nil_guard() {
        let ty = TypeDescriptor::array(TypeDescriptor::nilable(TypeDescriptor::float()));
        let de = compiled(ty, Operation::Deserialize).unwrap();
        let out = de(&Value::Array(vec![Value::Int(1), Value::Nil]), true).unwrap();
        assert_eq!(out, Value::Array(vec![Value::Float(1.0), Value::Nil]));
    }

    #[test]
    fn test_codec_mapping_keys_encode_to_text() {
        let codec: Arc<dyn ScalarCodec> = Arc::new(EnumCodec::new("Color", ["red", "blue"]));
        let ty = TypeDescriptor::mapping(TypeDescriptor::custom(codec), TypeDescriptor::integer());
        let ser = compiled(ty.clone(), Operation::Serialize).unwrap();
        let map: ValueMap = [("red", 1)].into_iter().collect();
        assert_eq!(ser(&Value::Map(map.clone()), true).unwrap(), Value::Map(map));

        let de = compiled(ty, Operation::Deserialize).unwrap();
        let bad: ValueMap = [("green", 1)].into_iter().collect();
        assert!(matches!(de(&Value::Map(bad), true), Err(TransformError::Codec { .. })));
    }

    #[test]
    fn test_unresolved_struct_reference() {
        let de = compiled(TypeDescriptor::struct_ref("Ghost"), Operation::Deserialize).unwrap();
        let err = de(&Value::Map(ValueMap::new()), true).unwrap_err();
        match err {
            TransformError::Nested(FieldError::UnresolvedStruct { name }) => assert_eq!(name, "Ghost"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
