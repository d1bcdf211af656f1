//! Strategy selector
//!
//! For each shape, picks the cheapest correct conversion strategy for each
//! of the three operations independently:
//!
//! ```text
//! Identity  >  ShallowCopy / WidenFloat  >  Elementwise / Delegate*  >  DeepClone
//! ```
//!
//! A container whose elements need no work collapses to `ShallowCopy`.
//! At nested positions a nilable shape gets a `NilGuard`; at the top of a
//! field the generated routine checks nil itself.

use std::fmt;
use std::sync::Arc;

use super::shape::{Shape, ShapeKind};
use crate::schema::{PrimitiveKind, ScalarCodec, StructRef};

/// The three operations a strategy is selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Serialize,
    Deserialize,
    /// Copying a default value into a fresh instance
    Clone,
}

/// Container kinds that can be copied one level deep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Set,
    Mapping,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Array => "array",
            Container::Set => "set",
            Container::Mapping => "mapping",
        }
    }
}

/// Per-element work of an [`Strategy::Elementwise`] strategy
#[derive(Debug, Clone)]
pub enum Elementwise {
    /// Arrays and sets
    Sequence { container: Container, element: Strategy },
    Mapping { key: Strategy, value: Strategy },
}

/// Conversion strategy for one value position
#[derive(Clone)]
pub enum Strategy {
    /// Passed through unchanged
    Identity,
    /// Wire integers become floats
    WidenFloat,
    /// One-level copy of a container with identity elements
    ShallowCopy(Container),
    Elementwise(Box<Elementwise>),
    /// The nested struct's own generated routines
    DelegateToStruct(StructRef),
    /// The custom scalar's encode/decode
    DelegateToCodec(Arc<dyn ScalarCodec>),
    /// Generic structural clone
    DeepClone,
    /// Nil passes through; anything else goes to the inner strategy
    NilGuard(Box<Strategy>),
}

impl Strategy {
    pub fn is_identity(&self) -> bool {
        matches!(self, Strategy::Identity)
    }

    /// Relative cost, lower is cheaper
    pub fn cost_rank(&self) -> u8 {
        match self {
            Strategy::Identity => 0,
            Strategy::ShallowCopy(_) | Strategy::WidenFloat => 1,
            Strategy::Elementwise(_)
            | Strategy::DelegateToStruct(_)
            | Strategy::DelegateToCodec(_) => 2,
            Strategy::DeepClone => 3,
            Strategy::NilGuard(inner) => inner.cost_rank(),
        }
    }

    /// Compact rendering used by `explain`
    pub fn describe(&self) -> String {
        match self {
            Strategy::Identity => "identity".to_string(),
            Strategy::WidenFloat => "widen_float".to_string(),
            Strategy::ShallowCopy(c) => format!("shallow_copy({})", c.as_str()),
            Strategy::Elementwise(inner) => match inner.as_ref() {
                Elementwise::Sequence { container, element } => {
                    format!("each_{}({})", container.as_str(), element.describe())
                }
                Elementwise::Mapping { key, value } => {
                    format!("each_mapping({}, {})", key.describe(), value.describe())
                }
            },
            Strategy::DelegateToStruct(r) => format!("struct({})", r.name()),
            Strategy::DelegateToCodec(codec) => format!("codec({})", codec.name()),
            Strategy::DeepClone => "deep_clone".to_string(),
            Strategy::NilGuard(inner) => format!("nil_guard({})", inner.describe()),
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Strategy for a field's top-level position (no nil guard).
pub fn select(shape: &Shape, op: Operation) -> Strategy {
    match &shape.kind {
        ShapeKind::Primitive(PrimitiveKind::Float) if op == Operation::Deserialize => {
            Strategy::WidenFloat
        }
        ShapeKind::Primitive(PrimitiveKind::Json) => Strategy::DeepClone,
        ShapeKind::Primitive(_) => Strategy::Identity,
        ShapeKind::Custom(codec) => match op {
            Operation::Clone if codec.is_immutable() => Strategy::Identity,
            Operation::Clone => Strategy::DeepClone,
            _ => Strategy::DelegateToCodec(Arc::clone(codec)),
        },
        ShapeKind::Struct(r) => match op {
            Operation::Clone => Strategy::DeepClone,
            _ => Strategy::DelegateToStruct(r.clone()),
        },
        ShapeKind::Array(elem) => sequence(Container::Array, elem, op),
        ShapeKind::Set(elem) => sequence(Container::Set, elem, op),
        ShapeKind::Mapping(key, value) => {
            let key = select_nested(key, op);
            let value = select_nested(value, op);
            if key.is_identity() && value.is_identity() {
                Strategy::ShallowCopy(Container::Mapping)
            } else {
                Strategy::Elementwise(Box::new(Elementwise::Mapping { key, value }))
            }
        }
    }
}

fn sequence(container: Container, elem: &Shape, op: Operation) -> Strategy {
    let element = select_nested(elem, op);
    if element.is_identity() {
        Strategy::ShallowCopy(container)
    } else {
        Strategy::Elementwise(Box::new(Elementwise::Sequence { container, element }))
    }
}

/// Strategy for a position inside a container.
fn select_nested(shape: &Shape, op: Operation) -> Strategy {
    let inner = select(shape, op);
    if shape.nilable && !inner.is_identity() {
        Strategy::NilGuard(Box::new(inner))
    } else {
        inner
    }
}

/// The strategies chosen for one field
#[derive(Debug, Clone)]
pub struct FieldStrategies {
    pub serialize: Strategy,
    pub deserialize: Strategy,
    pub clone: Strategy,
}

impl FieldStrategies {
    pub fn select(shape: &Shape) -> Self {
        Self {
            serialize: select(shape, Operation::Serialize),
            deserialize: select(shape, Operation::Deserialize),
            clone: select(shape, Operation::Clone),
        }
    }
}
