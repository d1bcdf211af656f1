//! Field declarations
//!
//! A field is declared with a name, a [`TypeDescriptor`] and [`FieldOptions`].
//! Once a schema is built, each field becomes an immutable [`FieldSchema`]
//! with a storage slot and a wire key.

use std::fmt;
use std::sync::Arc;

use super::types::TypeDescriptor;
use crate::value::Value;

/// Zero-argument default factory, invoked once per instance
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Extra assignment check run after the type check
pub type FieldValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Opaque metadata for external collaborators (redaction, loaders, ...)
pub type FieldMetadata = serde_json::Map<String, serde_json::Value>;

/// Declared default of a field
#[derive(Clone, Default)]
pub enum DefaultSpec {
    /// No default declared
    #[default]
    None,
    /// Explicitly declared as having no default; must be present
    Required,
    /// Literal default
    Fixed(Value),
    /// Factory invoked per instance
    Factory(DefaultFactory),
}

impl DefaultSpec {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultSpec::None | DefaultSpec::Required)
    }

    /// True for a literal `nil` default
    pub fn is_explicit_nil(&self) -> bool {
        matches!(self, DefaultSpec::Fixed(Value::Nil))
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSpec::None => f.write_str("None"),
            DefaultSpec::Required => f.write_str("Required"),
            DefaultSpec::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            DefaultSpec::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Options accepted when declaring a field
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub(crate) default: Option<Value>,
    pub(crate) factory: Option<DefaultFactory>,
    pub(crate) required: bool,
    pub(crate) wire_key: Option<String>,
    pub(crate) store_nil: bool,
    pub(crate) dont_store: bool,
    pub(crate) raise_on_nil_write: bool,
    pub(crate) validate: Option<FieldValidateFn>,
    pub(crate) metadata: FieldMetadata,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal default
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Per-instance default factory
    pub fn with_factory(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Mark as explicitly required (no default)
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Override the wire key (defaults to the field name)
    pub fn wire_key(mut self, key: impl Into<String>) -> Self {
        self.wire_key = Some(key.into());
        self
    }

    /// Emit explicit nil on serialize instead of omitting the key
    pub fn store_nil(mut self) -> Self {
        self.store_nil = true;
        self
    }

    /// Exclude from serialize and deserialize
    pub fn dont_store(mut self) -> Self {
        self.dont_store = true;
        self
    }

    /// Nilable on read, but nil writes are rejected and a missing value
    /// is tolerated once per deserialize
    pub fn raise_on_nil_write(mut self) -> Self {
        self.raise_on_nil_write = true;
        self
    }

    pub fn validate(
        mut self,
        check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Arc::new(check));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("default", &self.default)
            .field("factory", &self.factory.is_some())
            .field("required", &self.required)
            .field("wire_key", &self.wire_key)
            .field("store_nil", &self.store_nil)
            .field("dont_store", &self.dont_store)
            .field("raise_on_nil_write", &self.raise_on_nil_write)
            .finish()
    }
}

/// A finalized field of a struct schema
#[derive(Clone)]
pub struct FieldSchema {
    pub(crate) name: Arc<str>,
    pub(crate) ty: TypeDescriptor,
    pub(crate) slot: usize,
    pub(crate) wire_key: Arc<str>,
    pub(crate) default: DefaultSpec,
    pub(crate) options: FieldOptions,
}

impl FieldSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// Index of the field's storage in an instance
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn wire_key(&self) -> &str {
        &self.wire_key
    }

    pub fn default_spec(&self) -> &DefaultSpec {
        &self.default
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn metadata(&self) -> &FieldMetadata {
        &self.options.metadata
    }

    pub fn is_nilable(&self) -> bool {
        self.ty.is_nilable()
    }

    pub fn store_nil(&self) -> bool {
        self.options.store_nil
    }

    pub fn dont_store(&self) -> bool {
        self.options.dont_store
    }

    pub fn raise_on_nil_write(&self) -> bool {
        self.options.raise_on_nil_write
    }

    /// Non-nilable, or nilable with `raise_on_nil_write`
    pub fn needs_nil_write_check(&self) -> bool {
        !self.is_nilable() || self.options.raise_on_nil_write
    }

    pub(crate) fn validate_hook(&self) -> Option<&FieldValidateFn> {
        self.options.validate.as_ref()
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("type", &self.ty.to_string())
            .field("slot", &self.slot)
            .field("wire_key", &self.wire_key)
            .field("default", &self.default)
            .finish()
    }
}
