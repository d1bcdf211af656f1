//! fieldgen - schema-driven struct serialization
//!
//! Struct types are declared as field schemas. For each type, the first
//! conversion synthesizes a bundle of routines specialized to the declared
//! field shapes: serialize (strict and lenient), deserialize, apply-defaults,
//! and one setter validator per field. Bundles are cached per type and
//! shared by every instance.

pub mod cli;
pub mod config;
pub mod engine;
pub mod instance;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use instance::Instance;
pub use registry::{SchemaRegistry, StructType};
pub use schema::{
    ErrorKind, FieldError, FieldObserver, FieldOptions, FieldResult, SchemaBuilder,
    StructSchema, TypeDescriptor,
};
pub use value::{CustomValue, Value, ValueMap};
