//! Setter validator builder
//!
//! Every assignment to a field passes through its [`SetterValidator`]:
//! one level of `Nilable` is unwrapped, nil is decided by the field's nil
//! policy, and anything else must satisfy the underlying type's predicate.
//! Predicates are compiled once from the descriptor and check container
//! elements recursively.

use std::panic::Location;
use std::sync::Arc;

use crate::schema::{
    FieldError, FieldResult, FieldSchema, FieldValidateFn, PrimitiveKind, TypeDescriptor,
    ValidationFailure,
};
use crate::value::Value;

/// Compiled validity check for non-nil values
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Compile the validity predicate of a descriptor.
pub fn build_predicate(ty: &TypeDescriptor) -> Predicate {
    match ty {
        TypeDescriptor::Primitive(kind) => match kind {
            PrimitiveKind::Bool => Arc::new(|v| matches!(v, Value::Bool(_))),
            PrimitiveKind::Integer => Arc::new(|v| matches!(v, Value::Int(_))),
            PrimitiveKind::Float => Arc::new(|v| matches!(v, Value::Float(_))),
            PrimitiveKind::Text => Arc::new(|v| matches!(v, Value::Text(_))),
            PrimitiveKind::Json => Arc::new(Value::is_wire),
        },
        TypeDescriptor::CustomScalar(codec) => {
            let codec = Arc::clone(codec);
            Arc::new(move |v| codec.accepts(v))
        }
        TypeDescriptor::StructRef(r) => {
            let name = r.clone();
            Arc::new(move |v| v.as_struct().map_or(false, |inst| inst.is_a(name.name())))
        }
        TypeDescriptor::Array(elem) => {
            let elem = build_predicate(elem);
            Arc::new(move |v| v.as_array().map_or(false, |items| items.iter().all(|i| elem(i))))
        }
        TypeDescriptor::Set(elem) => {
            let elem = build_predicate(elem);
            Arc::new(move |v| v.as_set().map_or(false, |items| items.iter().all(|i| elem(i))))
        }
        TypeDescriptor::Mapping(key, value) => {
            let key = build_predicate(key);
            let value = build_predicate(value);
            Arc::new(move |v| {
                v.as_map()
                    .map_or(false, |map| map.iter().all(|(k, val)| key(k) && value(val)))
            })
        }
        TypeDescriptor::Nilable(inner) => {
            let inner = build_predicate(inner);
            Arc::new(move |v| v.is_nil() || inner(v))
        }
    }
}

/// The assignment gate of one field
#[derive(Clone)]
pub struct SetterValidator {
    struct_name: Arc<str>,
    field: Arc<str>,
    expected: String,
    accepts_nil: bool,
    predicate: Predicate,
    hook: Option<FieldValidateFn>,
}

impl SetterValidator {
    pub fn build(struct_name: &str, field: &FieldSchema) -> Self {
        let underlying = match field.ty() {
            TypeDescriptor::Nilable(inner) => inner.as_ref(),
            other => other,
        };
        // An explicit nil default makes the field nil-tolerant on write,
        // whatever its type says.
        let accepts_nil = !field.needs_nil_write_check() || field.default_spec().is_explicit_nil();
        Self {
            struct_name: Arc::from(struct_name),
            field: Arc::clone(&field.name),
            expected: underlying.type_name(),
            accepts_nil,
            predicate: build_predicate(underlying),
            hook: field.validate_hook().cloned(),
        }
    }

    pub fn accepts_nil(&self) -> bool {
        self.accepts_nil
    }

    /// Rendered underlying type
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Check a value about to be assigned.
    pub fn check(&self, value: &Value, location: Option<&Location<'_>>) -> FieldResult<()> {
        if value.is_nil() {
            return if self.accepts_nil {
                Ok(())
            } else {
                Err(self.failure(value, None, location))
            };
        }
        if !(self.predicate)(value) {
            return Err(self.failure(value, None, location));
        }
        if let Some(hook) = &self.hook {
            if let Err(reason) = hook(value) {
                return Err(self.failure(value, Some(reason), location));
            }
        }
        Ok(())
    }

    fn failure(
        &self,
        value: &Value,
        reason: Option<String>,
        location: Option<&Location<'_>>,
    ) -> FieldError {
        FieldError::ValueValidation(Box::new(ValidationFailure {
            struct_name: self.struct_name.to_string(),
            field: self.field.to_string(),
            expected: self.expected.clone(),
            actual: value.to_string(),
            actual_shape: value.shape_name(),
            reason,
            location: location.map(|l| format!("{}:{}", l.file(), l.line())),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldOptions, SchemaBuilder};

    fn validator(ty: TypeDescriptor, opts: FieldOptions) -> SetterValidator {
        let schema = SchemaBuilder::new("Probe")
            .field_with("p", ty, opts)
            .build()
            .unwrap();
        SetterValidator::build("Probe", &schema.fields()[0])
    }

    #[test]
    fn test_nilable_primitive() {
        let v = validator(TypeDescriptor::nilable(TypeDescriptor::integer()), FieldOptions::new());
        assert!(v.check(&Value::Nil, None).is_ok());
        assert!(v.check(&Value::Int(4), None).is_ok());
        let err = v.check(&Value::text("4"), None).unwrap_err();
        let failure = err.validation().unwrap();
        assert_eq!(failure.expected, "Integer");
        assert_eq!(failure.actual_shape, "text");
    }

    #[test]
    fn test_non_nilable_rejects_nil() {
        let v = validator(TypeDescriptor::text(), FieldOptions::new());
        assert!(!v.accepts_nil());
        assert!(v.check(&Value::Nil, None).is_err());
    }

    #[test]
    fn test_raise_on_nil_write_rejects_nil() {
        let v = validator(
            TypeDescriptor::nilable(TypeDescriptor::text()),
            FieldOptions::new().raise_on_nil_write(),
        );
        assert!(v.check(&Value::Nil, None).is_err());
        assert!(v.check(&Value::text("ok"), None).is_ok());
    }

    #[test]
    fn test_explicit_nil_default_tolerates_nil_writes() {
        // Preserved legacy behavior: non-nilable type, yet nil is accepted.
        let v = validator(TypeDescriptor::integer(), FieldOptions::new().with_default(Value::Nil));
        assert!(v.accepts_nil());
        assert!(v.check(&Value::Nil, None).is_ok());
        assert!(v.check(&Value::Bool(true), None).is_err());
    }

    #[test]
    fn test_container_elements_are_checked() {
        let v = validator(
            TypeDescriptor::array(TypeDescriptor::nilable(TypeDescriptor::float())),
            FieldOptions::new(),
        );
        assert!(v.check(&Value::Array(vec![Value::Float(1.0), Value::Nil]), None).is_ok());
        assert!(v.check(&Value::Array(vec![Value::Int(1)]), None).is_err());
        assert!(v.check(&Value::set_of(vec![Value::Float(1.0)]), None).is_err());
    }

    #[test]
    fn test_validate_hook_reason() {
        let v = validator(
            TypeDescriptor::integer(),
            FieldOptions::new().validate(|v| match v.as_int() {
                Some(n) if n < 0 => Err("must not be negative".to_string()),
                _ => Ok(()),
            }),
        );
        assert!(v.check(&Value::Int(1), None).is_ok());
        let err = v.check(&Value::Int(-1), None).unwrap_err();
        assert_eq!(err.validation().unwrap().reason.as_deref(), Some("must not be negative"));
    }

    #[test]
    fn test_location_is_recorded() {
        let v = validator(TypeDescriptor::bool(), FieldOptions::new());
        let err = v.check(&Value::Int(1), Some(Location::caller())).unwrap_err();
        let location = err.validation().unwrap().location.clone().unwrap();
        assert!(location.contains("setter.rs"));
    }
}
