//! Schema file loader
//!
//! Reads `*.json` schema documents from a directory and defines them in a
//! [`SchemaRegistry`]. One document per struct type:
//!
//! ```json
//! {
//!   "name": "Order",
//!   "inherits": "Record",
//!   "fields": [
//!     {"name": "id", "type": "uuid", "required": true},
//!     {"name": "placed_at", "type": "timestamp", "wire_key": "placedAt"},
//!     {"name": "lines", "type": {"type": "array", "of": "OrderLine"}, "default": []},
//!     {"name": "note", "type": {"type": "nilable", "of": "text"}, "store_nil": true},
//!     {"name": "status", "type": {"type": "enum", "name": "Status", "values": ["open", "closed"]}}
//!   ]
//! }
//! ```
//!
//! A type is either a name (`bool`, `integer`, `float`, `text`, `json`, a
//! codec name, or otherwise a struct name) or a tagged object. Defaults are
//! given in wire form. `"default": null` is an explicit nil default, which is
//! distinct from no default at all.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use super::builder::SchemaBuilder;
use super::codec::{CodecTable, EnumCodec};
use super::errors::{FieldError, FieldResult};
use super::field::{FieldMetadata, FieldOptions};
use super::types::{PrimitiveKind, TypeDescriptor};
use crate::observability::{log_event_with_fields, Event};
use crate::registry::{SchemaRegistry, StructType};
use crate::value::{Value, ValueMap};

/// One struct type as written in a schema file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    pub name: String,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

/// One field declaration in a schema file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub wire_key: Option<String>,
    /// `None` when absent, `Some(Null)` for an explicit nil default
    #[serde(default, deserialize_with = "present")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub store_nil: bool,
    #[serde(default)]
    pub dont_store: bool,
    #[serde(default)]
    pub raise_on_nil_write: bool,
    #[serde(default)]
    pub metadata: FieldMetadata,
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// A type written either as a bare name or as a tagged object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    Named(String),
    Spec(TypeSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum TypeSpec {
    Array { of: Box<TypeRef> },
    Set { of: Box<TypeRef> },
    Mapping { key: Box<TypeRef>, value: Box<TypeRef> },
    Nilable { of: Box<TypeRef> },
    Struct { name: String },
    Enum { name: String, values: Vec<String> },
}

/// Loads schema documents from one directory
pub struct SchemaLoader {
    dir: PathBuf,
    codecs: CodecTable,
    documents: Vec<(PathBuf, SchemaDocument)>,
}

impl SchemaLoader {
    /// Loader for `dir` with the built-in codecs
    pub fn new(dir: &Path) -> Self {
        Self::with_codecs(dir, CodecTable::with_builtins())
    }

    pub fn with_codecs(dir: &Path, codecs: CodecTable) -> Self {
        Self {
            dir: dir.to_path_buf(),
            codecs,
            documents: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn codecs(&self) -> &CodecTable {
        &self.codecs
    }

    pub fn documents(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.documents.iter().map(|(_, doc)| doc)
    }

    /// Parse every `*.json` file in the directory, in file name order.
    ///
    /// Returns the number of documents loaded.
    pub fn load_all(&mut self) -> FieldResult<usize> {
        let dir_display = self.dir.display().to_string();
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| FieldError::schema_file(&dir_display, e.to_string()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| FieldError::schema_file(&dir_display, e.to_string()))?
                .path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let doc = Self::load_file(&path)?;
            self.documents.push((path, doc));
        }
        Ok(self.documents.len())
    }

    fn load_file(path: &Path) -> FieldResult<SchemaDocument> {
        let display = path.display().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| FieldError::schema_file(&display, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| FieldError::schema_file(&display, e.to_string()))
    }

    /// Define every loaded document in `registry`.
    ///
    /// Parents are defined before the types that inherit from them, whatever
    /// the file order.
    pub fn register_into(&mut self, registry: &SchemaRegistry) -> FieldResult<Vec<Arc<StructType>>> {
        let mut pending: Vec<usize> = (0..self.documents.len()).collect();
        let mut defined = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();
            for index in pending {
                let ready = match &self.documents[index].1.inherits {
                    Some(parent) => registry.contains(parent),
                    None => true,
                };
                if ready {
                    let ty = self.define_document(index, registry)?;
                    defined.push(ty);
                } else {
                    waiting.push(index);
                }
            }
            if waiting.len() == before {
                let (path, doc) = &self.documents[waiting[0]];
                return Err(FieldError::schema_file(
                    path.display().to_string(),
                    format!(
                        "{} inherits from '{}', which is undefined or cyclic",
                        doc.name,
                        doc.inherits.as_deref().unwrap_or_default()
                    ),
                ));
            }
            pending = waiting;
        }

        let count = defined.len().to_string();
        log_event_with_fields(
            Event::SchemasLoaded,
            &[("dir", self.dir.display().to_string().as_str()), ("count", count.as_str())],
        );
        Ok(defined)
    }

    fn define_document(
        &mut self,
        index: usize,
        registry: &SchemaRegistry,
    ) -> FieldResult<Arc<StructType>> {
        let (path, doc) = self.documents[index].clone();
        let in_file = |err: FieldError| match err {
            err @ FieldError::SchemaFile { .. } => err,
            other => FieldError::schema_file(path.display().to_string(), other.to_string()),
        };

        let mut builder = SchemaBuilder::new(&doc.name);
        if let Some(parent) = &doc.inherits {
            let parent = registry.resolve(parent).map_err(in_file)?;
            builder = builder.inherit(parent.schema());
        }

        let mut names = HashSet::new();
        for field in &doc.fields {
            if !names.insert(field.name.as_str()) {
                return Err(in_file(FieldError::schema_definition(
                    &doc.name,
                    &field.name,
                    "field is declared twice",
                )));
            }
            let ty = self.resolve_type(&field.ty).map_err(|reason| {
                in_file(FieldError::schema_definition(&doc.name, &field.name, reason))
            })?;
            let options = field_options(field, &ty).map_err(|reason| {
                in_file(FieldError::schema_definition(&doc.name, &field.name, reason))
            })?;
            builder = builder.field_with(&field.name, ty, options);
        }

        let schema = builder.build().map_err(in_file)?;
        registry.define(schema).map_err(in_file)
    }

    /// Turn a written type into a descriptor. Inline enums are added to the
    /// codec table so later fields can name them.
    fn resolve_type(&mut self, ty: &TypeRef) -> Result<TypeDescriptor, String> {
        match ty {
            TypeRef::Named(name) => Ok(match name.as_str() {
                "bool" => TypeDescriptor::bool(),
                "integer" => TypeDescriptor::integer(),
                "float" => TypeDescriptor::float(),
                "text" => TypeDescriptor::text(),
                "json" => TypeDescriptor::json(),
                "" => return Err("empty type name".to_string()),
                other => match self.codecs.get(other) {
                    Some(codec) => TypeDescriptor::custom(codec),
                    None => TypeDescriptor::struct_ref(other),
                },
            }),
            TypeRef::Spec(spec) => match spec {
                TypeSpec::Array { of } => Ok(TypeDescriptor::array(self.resolve_type(of)?)),
                TypeSpec::Set { of } => Ok(TypeDescriptor::set(self.resolve_type(of)?)),
                TypeSpec::Mapping { key, value } => {
                    let key = self.resolve_type(key)?;
                    let value = self.resolve_type(value)?;
                    Ok(TypeDescriptor::mapping(key, value))
                }
                TypeSpec::Nilable { of } => Ok(TypeDescriptor::nilable(self.resolve_type(of)?)),
                TypeSpec::Struct { name } => Ok(TypeDescriptor::struct_ref(name)),
                TypeSpec::Enum { name, values } => {
                    if values.is_empty() {
                        return Err(format!("enum {} has no values", name));
                    }
                    let codec = Arc::new(EnumCodec::new(name.as_str(), values));
                    self.codecs.register(name.as_str(), codec.clone());
                    Ok(TypeDescriptor::custom(codec))
                }
            },
        }
    }
}

fn field_options(field: &FieldDocument, ty: &TypeDescriptor) -> Result<FieldOptions, String> {
    let mut options = FieldOptions::new();
    if let Some(default) = &field.default {
        let value = decode_default(ty, Value::from_json(default))
            .map_err(|e| format!("invalid default: {}", e))?;
        options = options.with_default(value);
    }
    if field.required {
        options = options.required();
    }
    if let Some(key) = &field.wire_key {
        options = options.wire_key(key.as_str());
    }
    if field.store_nil {
        options = options.store_nil();
    }
    if field.dont_store {
        options = options.dont_store();
    }
    if field.raise_on_nil_write {
        options = options.raise_on_nil_write();
    }
    for (key, value) in &field.metadata {
        options = options.meta(key.as_str(), value.clone());
    }
    Ok(options)
}

/// Convert a wire-form default into the in-memory form of `ty`
fn decode_default(ty: &TypeDescriptor, value: Value) -> Result<Value, String> {
    if value.is_nil() {
        return Ok(value);
    }
    match (ty, value) {
        (TypeDescriptor::Nilable(inner), value) => decode_default(inner, value),
        (TypeDescriptor::Primitive(PrimitiveKind::Float), Value::Int(i)) => Ok(Value::Float(i as f64)),
        (TypeDescriptor::Primitive(_), value) => Ok(value),
        (TypeDescriptor::CustomScalar(codec), value) => codec.decode(&value),
        (TypeDescriptor::Array(elem), Value::Array(items)) => items
            .into_iter()
            .map(|item| decode_default(elem, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (TypeDescriptor::Set(elem), Value::Array(items)) => items
            .into_iter()
            .map(|item| decode_default(elem, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::set_of),
        (TypeDescriptor::Mapping(key_ty, value_ty), Value::Map(map)) => {
            let mut out = ValueMap::with_capacity(map.len());
            for (k, v) in map {
                let k = match key_ty.as_ref() {
                    TypeDescriptor::CustomScalar(codec) => codec.decode(&k)?,
                    _ => k,
                };
                out.insert(k, decode_default(value_ty, v)?);
            }
            Ok(Value::Map(out))
        }
        (TypeDescriptor::StructRef(r), _) => Err(format!(
            "struct defaults ({}) cannot be written in a schema file",
            r.name()
        )),
        (ty, value) => Err(format!("expected {}, got {}", ty, value.shape_name())),
    }
}
