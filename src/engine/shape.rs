//! Type shape classifier
//!
//! Maps a [`TypeDescriptor`] to a [`Shape`]: a closed set of structural
//! variants, classified recursively. `Nilable(inner)` classifies as the
//! inner shape tagged `nilable`. Struct references are never expanded, so
//! classification terminates for recursive schemas.

use std::fmt;
use std::sync::Arc;

use crate::schema::{PrimitiveKind, ScalarCodec, StructRef, TypeDescriptor};

/// Structural classification of a descriptor
#[derive(Clone)]
pub enum ShapeKind {
    Primitive(PrimitiveKind),
    Custom(Arc<dyn ScalarCodec>),
    Struct(StructRef),
    Array(Box<Shape>),
    Set(Box<Shape>),
    Mapping(Box<Shape>, Box<Shape>),
}

/// A classified descriptor
#[derive(Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    /// The descriptor was wrapped in `Nilable`
    pub nilable: bool,
}

impl Shape {
    /// Short tag for the shape variant
    pub fn tag(&self) -> &'static str {
        match &self.kind {
            ShapeKind::Primitive(_) => "primitive",
            ShapeKind::Custom(_) => "custom_scalar",
            ShapeKind::Struct(_) => "struct",
            ShapeKind::Array(_) => "array",
            ShapeKind::Set(_) => "set",
            ShapeKind::Mapping(_, _) => "mapping",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Array(_) | ShapeKind::Set(_) | ShapeKind::Mapping(_, _)
        )
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nilable {
            f.write_str("?")?;
        }
        match &self.kind {
            ShapeKind::Primitive(kind) => write!(f, "{}", kind.type_name()),
            ShapeKind::Custom(codec) => write!(f, "custom({})", codec.name()),
            ShapeKind::Struct(r) => write!(f, "struct({})", r.name()),
            ShapeKind::Array(elem) => write!(f, "array({:?})", elem),
            ShapeKind::Set(elem) => write!(f, "set({:?})", elem),
            ShapeKind::Mapping(k, v) => write!(f, "mapping({:?}, {:?})", k, v),
        }
    }
}

/// Classify a descriptor.
pub fn classify(ty: &TypeDescriptor) -> Shape {
    match ty {
        TypeDescriptor::Nilable(inner) => Shape {
            nilable: true,
            ..classify(inner)
        },
        TypeDescriptor::Primitive(kind) => plain(ShapeKind::Primitive(*kind)),
        TypeDescriptor::CustomScalar(codec) => plain(ShapeKind::Custom(Arc::clone(codec))),
        TypeDescriptor::StructRef(r) => plain(ShapeKind::Struct(r.clone())),
        TypeDescriptor::Array(elem) => plain(ShapeKind::Array(Box::new(classify(elem)))),
        TypeDescriptor::Set(elem) => plain(ShapeKind::Set(Box::new(classify(elem)))),
        TypeDescriptor::Mapping(k, v) => plain(ShapeKind::Mapping(
            Box::new(classify(k)),
            Box::new(classify(v)),
        )),
    }
}

fn plain(kind: ShapeKind) -> Shape {
    Shape {
        kind,
        nilable: false,
    }
}

/// Reject descriptors that have no wire representation.
///
/// Mapping keys must be non-nilable text or a custom scalar, at any depth.
/// A nilable never wraps another nilable.
pub fn check_descriptor(ty: &TypeDescriptor) -> Result<(), String> {
    match ty {
        TypeDescriptor::Primitive(_)
        | TypeDescriptor::CustomScalar(_)
        | TypeDescriptor::StructRef(_) => Ok(()),
        TypeDescriptor::Nilable(inner) if inner.is_nilable() => {
            Err(format!("{} wraps a nilable in a nilable", ty))
        }
        TypeDescriptor::Nilable(inner) | TypeDescriptor::Array(inner) | TypeDescriptor::Set(inner) => {
            check_descriptor(inner)
        }
        TypeDescriptor::Mapping(key, value) => {
            match key.as_ref() {
                TypeDescriptor::Primitive(PrimitiveKind::Text) | TypeDescriptor::CustomScalar(_) => {}
                other => {
                    return Err(format!(
                        "mapping keys must be Text or a custom scalar, got {}",
                        other
                    ))
                }
            }
            check_descriptor(value)
        }
    }
}
