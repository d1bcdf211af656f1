//! Default policy resolver
//!
//! Classifies a field's declared default into the cheapest way to
//! materialize it per instance:
//! - `FixedImmutable`: shared directly (scalars, text, immutable custom values)
//! - `FixedMutableEmpty`: a fresh empty container, no clone step
//! - `FixedComplex`: copied through the field's clone strategy
//! - `Factory`: invoked per instance, result checked by the field's setter

use super::setter::SetterValidator;
use super::strategy::Container;
use super::synth::Transform;
use crate::schema::{DefaultFactory, DefaultSpec, FieldError, FieldResult};
use crate::value::{Value, ValueMap};

/// How a field's default is produced for a new instance
#[derive(Clone)]
pub enum DefaultPolicy {
    NoDefault,
    FixedImmutable(Value),
    FixedMutableEmpty(Container),
    FixedComplex {
        value: Value,
        /// Compiled clone strategy; `None` means a generic deep clone
        clone: Option<Transform>,
    },
    Factory(DefaultFactory),
}

impl DefaultPolicy {
    pub fn classify(spec: &DefaultSpec, clone: Option<Transform>) -> Self {
        let value = match spec {
            DefaultSpec::None | DefaultSpec::Required => return DefaultPolicy::NoDefault,
            DefaultSpec::Factory(factory) => return DefaultPolicy::Factory(factory.clone()),
            DefaultSpec::Fixed(value) => value,
        };
        match value {
            Value::Nil
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Text(_)
            | Value::Custom(_) => DefaultPolicy::FixedImmutable(value.clone()),
            Value::Array(items) if items.is_empty() => {
                DefaultPolicy::FixedMutableEmpty(Container::Array)
            }
            Value::Set(items) if items.is_empty() => DefaultPolicy::FixedMutableEmpty(Container::Set),
            Value::Map(map) if map.is_empty() => {
                DefaultPolicy::FixedMutableEmpty(Container::Mapping)
            }
            _ => DefaultPolicy::FixedComplex {
                value: value.clone(),
                clone,
            },
        }
    }

    pub fn has_default(&self) -> bool {
        !matches!(self, DefaultPolicy::NoDefault)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DefaultPolicy::NoDefault => "no_default",
            DefaultPolicy::FixedImmutable(_) => "fixed_immutable",
            DefaultPolicy::FixedMutableEmpty(_) => "fixed_mutable_empty",
            DefaultPolicy::FixedComplex { .. } => "fixed_complex",
            DefaultPolicy::Factory(_) => "factory",
        }
    }

    /// Produce the default for one new instance.
    ///
    /// Returns `Ok(None)` when the field has no default.
    pub fn materialize(&self, validator: &SetterValidator) -> FieldResult<Option<Value>> {
        let value = match self {
            DefaultPolicy::NoDefault => return Ok(None),
            DefaultPolicy::FixedImmutable(value) => value.clone(),
            DefaultPolicy::FixedMutableEmpty(Container::Array) => Value::Array(Vec::new()),
            DefaultPolicy::FixedMutableEmpty(Container::Set) => Value::Set(Vec::new()),
            DefaultPolicy::FixedMutableEmpty(Container::Mapping) => Value::Map(ValueMap::new()),
            DefaultPolicy::FixedComplex { value, clone } => match clone {
                Some(transform) => transform(value, false).map_err(|e| {
                    FieldError::argument(format!("cannot copy default value: {}", e))
                })?,
                None => value.deep_clone(),
            },
            DefaultPolicy::Factory(factory) => {
                let produced = factory();
                validator.check(&produced, None)?;
                produced
            }
        };
        Ok(Some(value))
    }
}
