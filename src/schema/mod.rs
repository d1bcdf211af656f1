//! Schema definition subsystem
//!
//! Struct schemas are declared once, checked at definition time, and are
//! immutable afterwards.
//!
//! # Definition-time rules
//!
//! - Field types must be representable on the wire (mapping keys are text)
//! - A field has at most one default, and a required field has none
//! - Literal defaults must pass the field's own setter check
//! - Wire keys are unique within a struct
//!
//! Violations are reported as [`FieldError::SchemaDefinition`].

mod builder;
mod codec;
mod errors;
mod field;
mod loader;
mod types;

pub use builder::{FieldObserver, SchemaBuilder, StructSchema};
pub use codec::{CodecTable, EnumCodec, ScalarCodec, TimestampCodec, UuidCodec};
pub use errors::{ErrorKind, FieldError, FieldResult, ValidationFailure};
pub use field::{
    DefaultFactory, DefaultSpec, FieldMetadata, FieldOptions, FieldSchema, FieldValidateFn,
};
pub use loader::{FieldDocument, SchemaDocument, SchemaLoader, TypeRef, TypeSpec};
pub use types::{PrimitiveKind, StructRef, TypeDescriptor};
