//! Type descriptors
//!
//! Supported shapes:
//! - primitive: bool, integer, float, text, json (untyped wire value)
//! - custom scalar: a value converted through a [`ScalarCodec`]
//! - struct reference: another registered struct, resolved lazily by name
//! - array, set, mapping: homogeneous containers
//! - nilable: wraps any other descriptor; never wraps itself

use std::fmt;
use std::sync::Arc;

use super::codec::ScalarCodec;

/// Primitive scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Integer,
    Float,
    Text,
    /// Any wire value; the one primitive that cannot be specialized
    Json,
}

impl PrimitiveKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Integer => "Integer",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Text => "Text",
            PrimitiveKind::Json => "Json",
        }
    }
}

/// Reference to a struct type by name.
///
/// Never expanded eagerly, so mutually recursive schemas are representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRef {
    name: Arc<str>,
}

impl StructRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Declared type of a field
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    CustomScalar(Arc<dyn ScalarCodec>),
    StructRef(StructRef),
    /// Element type boxed to allow recursive types
    Array(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Mapping(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Nilable(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn bool() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Bool)
    }

    pub fn integer() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    pub fn text() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Text)
    }

    pub fn json() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Json)
    }

    pub fn custom(codec: Arc<dyn ScalarCodec>) -> Self {
        TypeDescriptor::CustomScalar(codec)
    }

    pub fn struct_ref(name: impl AsRef<str>) -> Self {
        TypeDescriptor::StructRef(StructRef::new(name))
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    pub fn set(element: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(element))
    }

    pub fn mapping(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping(Box::new(key), Box::new(value))
    }

    /// Wrap in `Nilable`, collapsing an already-nilable descriptor
    pub fn nilable(inner: TypeDescriptor) -> Self {
        match inner {
            TypeDescriptor::Nilable(_) => inner,
            other => TypeDescriptor::Nilable(Box::new(other)),
        }
    }

    pub fn is_nilable(&self) -> bool {
        matches!(self, TypeDescriptor::Nilable(_))
    }

    /// Strip nilable wrappers
    pub fn unwrap_nilable(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Nilable(inner) => inner.unwrap_nilable(),
            other => other,
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => f.write_str(kind.type_name()),
            TypeDescriptor::CustomScalar(codec) => f.write_str(codec.name()),
            TypeDescriptor::StructRef(r) => f.write_str(r.name()),
            TypeDescriptor::Array(elem) => write!(f, "Array<{}>", elem),
            TypeDescriptor::Set(elem) => write!(f, "Set<{}>", elem),
            TypeDescriptor::Mapping(k, v) => write!(f, "Mapping<{}, {}>", k, v),
            TypeDescriptor::Nilable(inner) => write!(f, "Nilable<{}>", inner),
        }
    }
}
