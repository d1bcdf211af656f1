//! Specialization engine
//!
//! Pipeline, run once per struct type:
//!
//! ```text
//! TypeDescriptor --classify--> Shape --select--> Strategy --compile--> closures
//!                                                          \
//!                         DefaultSpec --classify--> DefaultPolicy
//! ```
//!
//! The output is a [`RoutineBundle`], cached by the struct type and invoked
//! with no further shape analysis.

mod bundle;
mod defaults;
mod setter;
mod shape;
mod strategy;
mod synth;

pub use bundle::{FieldExplanation, RoutineBundle};
pub use defaults::DefaultPolicy;
pub use setter::{build_predicate, Predicate, SetterValidator};
pub use shape::{check_descriptor, classify, Shape, ShapeKind};
pub use strategy::{select, Container, Elementwise, FieldStrategies, Operation, Strategy};
pub use synth::{Transform, TransformError};

pub(crate) use synth::{synthesize, StructResolver};
