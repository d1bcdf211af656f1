//! Schema builder
//!
//! Fields are declared on a [`SchemaBuilder`]; `build()` checks every
//! definition-time rule and returns an immutable [`StructSchema`].
//! Inheritance is explicit composition: `inherit(base)` copies the base
//! fields, and a later local field with the same name replaces the
//! inherited one in place (type and options both, no merging).

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::errors::{FieldError, FieldResult};
use super::field::{DefaultSpec, FieldOptions, FieldSchema};
use super::types::TypeDescriptor;
use crate::engine::{check_descriptor, SetterValidator};
use crate::value::Value;

/// Hook invoked by generated routines and setters on field access
pub trait FieldObserver: Send + Sync {
    fn on_read(&self, _struct_name: &str, _field: &str, _value: &Value) {}

    fn on_write(&self, _struct_name: &str, _field: &str, _value: &Value) {}
}

/// Immutable field list of one struct type
#[derive(Clone)]
pub struct StructSchema {
    name: Arc<str>,
    fields: Vec<FieldSchema>,
    ancestors: Vec<Arc<str>>,
    observer: Option<Arc<dyn FieldObserver>>,
}

impl StructSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order, inherited first
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Base struct names, nearest first
    pub fn ancestors(&self) -> &[Arc<str>] {
        &self.ancestors
    }

    /// True if this struct is `name` or inherits from it
    pub fn is_a(&self, name: &str) -> bool {
        self.name.as_ref() == name || self.ancestors.iter().any(|a| a.as_ref() == name)
    }

    pub fn observer(&self) -> Option<&Arc<dyn FieldObserver>> {
        self.observer.as_ref()
    }
}

impl fmt::Debug for StructSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("ancestors", &self.ancestors)
            .finish()
    }
}

struct PendingField {
    name: String,
    ty: TypeDescriptor,
    options: FieldOptions,
}

/// Accumulates field declarations for one struct type
pub struct SchemaBuilder {
    name: String,
    fields: Vec<PendingField>,
    ancestors: Vec<Arc<str>>,
    observer: Option<Arc<dyn FieldObserver>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            ancestors: Vec::new(),
            observer: None,
        }
    }

    /// Copy the fields of `base` into this schema
    pub fn inherit(mut self, base: &StructSchema) -> Self {
        for field in base.fields() {
            self.push(PendingField {
                name: field.name().to_string(),
                ty: field.ty().clone(),
                options: field.options().clone(),
            });
        }
        self.ancestors.push(Arc::clone(&base.name));
        self.ancestors.extend(base.ancestors.iter().cloned());
        if self.observer.is_none() {
            self.observer = base.observer.clone();
        }
        self
    }

    pub fn field(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.field_with(name, ty, FieldOptions::default())
    }

    pub fn field_with(
        mut self,
        name: impl Into<String>,
        ty: TypeDescriptor,
        options: FieldOptions,
    ) -> Self {
        self.push(PendingField {
            name: name.into(),
            ty,
            options,
        });
        self
    }

    pub fn observer(mut self, observer: Arc<dyn FieldObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn push(&mut self, field: PendingField) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Validate every declaration and freeze the schema
    pub fn build(self) -> FieldResult<StructSchema> {
        if self.name.is_empty() {
            return Err(FieldError::schema_definition("", "", "struct name is empty"));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut wire_keys = HashSet::new();

        for (slot, pending) in self.fields.into_iter().enumerate() {
            let field = finalize(&self.name, slot, pending)?;
            if !wire_keys.insert(Arc::clone(&field.wire_key)) {
                return Err(FieldError::schema_definition(
                    &self.name,
                    field.name(),
                    format!("wire key '{}' is used by another field", field.wire_key),
                ));
            }
            fields.push(field);
        }

        Ok(StructSchema {
            name: Arc::from(self.name),
            fields,
            ancestors: self.ancestors,
            observer: self.observer,
        })
    }
}

fn finalize(struct_name: &str, slot: usize, pending: PendingField) -> FieldResult<FieldSchema> {
    let PendingField { name, ty, options } = pending;
    let invalid = |reason: String| FieldError::schema_definition(struct_name, &name, reason);

    if name.is_empty() {
        return Err(invalid("field name is empty".to_string()));
    }
    check_descriptor(&ty).map_err(invalid)?;

    let default = match (&options.default, &options.factory) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                "cannot specify both a default and a factory".to_string(),
            ))
        }
        (Some(value), None) => DefaultSpec::Fixed(value.clone()),
        (None, Some(factory)) => DefaultSpec::Factory(Arc::clone(factory)),
        (None, None) if options.required => DefaultSpec::Required,
        (None, None) => DefaultSpec::None,
    };

    if options.required {
        if !default.is_none() {
            return Err(invalid("a required field cannot have a default".to_string()));
        }
        if ty.is_nilable() {
            return Err(invalid("a nilable field cannot be required".to_string()));
        }
    }
    if options.raise_on_nil_write && !ty.is_nilable() {
        return Err(invalid(
            "raise_on_nil_write is only valid on nilable fields".to_string(),
        ));
    }
    if let Some(key) = &options.wire_key {
        if key.is_empty() {
            return Err(invalid("wire key is empty".to_string()));
        }
    }

    let wire_key: Arc<str> = Arc::from(options.wire_key.as_deref().unwrap_or(&name));
    let field = FieldSchema {
        name: Arc::from(name.as_str()),
        ty,
        slot,
        wire_key,
        default,
        options,
    };

    // Literal defaults must pass the field's own setter; nil is exempt.
    if let DefaultSpec::Fixed(value) = field.default_spec() {
        if !value.is_nil() {
            SetterValidator::build(struct_name, &field)
                .check(value, None)
                .map_err(|e| invalid(format!("invalid default: {}", e)))?;
        }
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ErrorKind;

    #[test]
    fn test_build_assigns_slots_and_wire_keys() {
        let schema = SchemaBuilder::new("User")
            .field("id", TypeDescriptor::integer())
            .field_with("name", TypeDescriptor::text(), FieldOptions::new().wire_key("n"))
            .build()
            .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].slot(), 0);
        assert_eq!(schema.field("name").unwrap().wire_key(), "n");
        assert_eq!(schema.field("id").unwrap().wire_key(), "id");
    }

    #[test]
    fn test_default_and_factory_conflict() {
        let err = SchemaBuilder::new("User")
            .field_with(
                "tags",
                TypeDescriptor::array(TypeDescriptor::text()),
                FieldOptions::new()
                    .with_default(Value::Array(vec![]))
                    .with_factory(|| Value::Array(vec![])),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_raise_on_nil_write_requires_nilable() {
        let err = SchemaBuilder::new("User")
            .field_with("id", TypeDescriptor::integer(), FieldOptions::new().raise_on_nil_write())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
    }

    #[test]
    fn test_invalid_literal_default_rejected() {
        let err = SchemaBuilder::new("User")
            .field_with("age", TypeDescriptor::integer(), FieldOptions::new().with_default("old"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid default"));
    }

    #[test]
    fn test_duplicate_wire_keys_rejected() {
        let err = SchemaBuilder::new("User")
            .field("a", TypeDescriptor::integer())
            .field_with("b", TypeDescriptor::integer(), FieldOptions::new().wire_key("a"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("wire key"));
    }

    #[test]
    fn test_required_nilable_rejected() {
        let err = SchemaBuilder::new("User")
            .field_with(
                "a",
                TypeDescriptor::nilable(TypeDescriptor::integer()),
                FieldOptions::new().required(),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
    }

    #[test]
    fn test_double_nilable_rejected() {
        let err = SchemaBuilder::new("User")
            .field(
                "score",
                TypeDescriptor::Nilable(Box::new(TypeDescriptor::nilable(TypeDescriptor::float()))),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn test_inherit_overrides_in_place() {
        let base = SchemaBuilder::new("Base")
            .field("id", TypeDescriptor::integer())
            .field("label", TypeDescriptor::text())
            .build()
            .unwrap();
        let derived = SchemaBuilder::new("Derived")
            .inherit(&base)
            .field("label", TypeDescriptor::nilable(TypeDescriptor::text()))
            .field("extra", TypeDescriptor::bool())
            .build()
            .unwrap();

        let names: Vec<_> = derived.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "label", "extra"]);
        assert!(derived.field("label").unwrap().is_nilable());
        assert!(!base.field("label").unwrap().is_nilable());
        assert!(derived.is_a("Base"));
        assert!(!base.is_a("Derived"));
    }
}
