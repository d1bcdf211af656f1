//! Required Field and Setter Tests
//!
//! - Strict deserialize raises on a missing required field
//! - Lenient deserialize logs it and stores nil
//! - A field marked missing at deserialize does not fail strict serialize
//! - Setters type-check every write
//! - An explicit nil default makes a non-nilable field accept nil

use std::sync::Arc;

use fieldgen::observability::MemorySink;
use fieldgen::schema::{ErrorKind, FieldOptions, SchemaBuilder, TypeDescriptor};
use fieldgen::{EngineConfig, FieldError, SchemaRegistry, StructType, Value};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<SchemaRegistry>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let registry = SchemaRegistry::with_sink(EngineConfig::default(), sink.clone());
    registry
        .define(
            SchemaBuilder::new("Account")
                .field("email", TypeDescriptor::text())
                .field_with(
                    "handle",
                    TypeDescriptor::nilable(TypeDescriptor::text()),
                    FieldOptions::new().raise_on_nil_write(),
                )
                .field_with(
                    "plan",
                    TypeDescriptor::text(),
                    FieldOptions::new().with_default("free"),
                )
                .field_with(
                    "limit",
                    TypeDescriptor::integer(),
                    FieldOptions::new().with_default(Value::Nil),
                )
                .field_with(
                    "seats",
                    TypeDescriptor::integer(),
                    FieldOptions::new().with_default(1).validate(|v| match v.as_int() {
                        Some(n) if n > 0 => Ok(()),
                        _ => Err("seats must be positive".to_string()),
                    }),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    (registry, sink)
}

fn account(registry: &SchemaRegistry) -> Arc<StructType> {
    registry.get("Account").unwrap()
}

// =============================================================================
// Missing Required Field Tests
// =============================================================================

/// Strict deserialize fails on a missing required field.
#[test]
fn test_strict_missing_required() {
    let (registry, sink) = setup();
    let err = account(&registry)
        .from_json(&json!({"handle": "ann"}), true)
        .unwrap_err();

    match &err {
        FieldError::MissingRequiredField { struct_name, field } => {
            assert_eq!(struct_name, "Account");
            assert_eq!(field, "email");
        }
        other => panic!("unexpected error {:?}", other),
    }
    let records = sink.records();
    assert!(records.iter().any(|d| d.kind == "FIELD_MISSING_REQUIRED" && !d.soft));
}

/// Lenient deserialize stores nil and reports softly; strict serialize then fails.
#[test]
fn test_lenient_missing_required_then_strict_serialize() {
    let (registry, sink) = setup();
    let inst = account(&registry)
        .from_json(&json!({"handle": "ann"}), false)
        .unwrap();

    assert_eq!(inst.get("email"), Some(&Value::Nil));
    assert!(!inst.was_missing_from_deserialize("email"));
    assert!(sink
        .take()
        .iter()
        .any(|d| d.kind == "FIELD_MISSING_REQUIRED" && d.soft && d.field.as_deref() == Some("email")));

    let err = inst.serialize(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);

    let wire = inst.serialize(false).unwrap();
    assert!(!wire.contains_key("email"));
    assert_eq!(wire.get("handle"), Some(&Value::text("ann")));
}

/// A field tolerated-once is marked at deserialize and does not fail strict serialize.
#[test]
fn test_missing_marker_suppresses_strict_serialize() {
    let (registry, sink) = setup();
    let inst = account(&registry)
        .from_json(&json!({"email": "a@b.c"}), true)
        .unwrap();

    assert!(inst.was_missing_from_deserialize("handle"));
    assert!(!inst.was_missing_from_deserialize("email"));
    assert_eq!(inst.get("handle"), Some(&Value::Nil));

    let wire = inst.serialize(true).unwrap();
    assert!(!wire.contains_key("handle"));
    assert_eq!(registry.metrics().snapshot().suppressed_missing, 1);
    assert!(sink
        .records()
        .iter()
        .any(|d| d.kind == "FIELD_MISSING_REQUIRED" && d.soft && d.field.as_deref() == Some("handle")));
}

/// Defaults fill non-nilable fields that are absent.
#[test]
fn test_missing_field_with_default() {
    let (registry, _sink) = setup();
    let inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann"}), true)
        .unwrap();

    assert_eq!(inst.get("plan"), Some(&Value::text("free")));
    assert_eq!(inst.get("seats"), Some(&Value::Int(1)));
    assert_eq!(inst.get("limit"), Some(&Value::Nil));
}

// =============================================================================
// Setter Tests
// =============================================================================

/// Writes of the wrong shape are rejected with the caller's location.
#[test]
fn test_setter_rejects_wrong_type() {
    let (registry, sink) = setup();
    let mut inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann"}), true)
        .unwrap();

    let err = inst.set("plan", 3).unwrap_err();
    let failure = err.validation().unwrap();
    assert_eq!(failure.field, "plan");
    assert_eq!(failure.expected, "Text");
    assert_eq!(failure.actual_shape, "integer");
    assert!(failure.location.as_deref().unwrap().contains("required_fields.rs"));

    assert_eq!(inst.get("plan"), Some(&Value::text("free")));
    assert!(sink.records().iter().any(|d| d.kind == "FIELD_VALUE_VALIDATION"));
    assert_eq!(registry.metrics().snapshot().validation_failures, 1);
}

/// Nil writes are rejected for fields that need a value.
#[test]
fn test_setter_rejects_nil() {
    let (registry, _sink) = setup();
    let mut inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann"}), true)
        .unwrap();

    assert!(inst.set("email", Value::Nil).is_err());
    assert!(inst.set("handle", Value::Nil).is_err());
    assert!(inst.set("handle", "bob").is_ok());
}

/// The extra validation hook runs after the type check.
#[test]
fn test_setter_validation_hook() {
    let (registry, _sink) = setup();
    let mut inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann"}), true)
        .unwrap();

    let err = inst.set("seats", 0).unwrap_err();
    assert_eq!(
        err.validation().and_then(|f| f.reason.as_deref()),
        Some("seats must be positive")
    );
    assert!(inst.set("seats", 4).is_ok());
}

/// Unknown field names are an argument error.
#[test]
fn test_setter_unknown_field() {
    let (registry, _sink) = setup();
    let mut inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann"}), true)
        .unwrap();
    assert_eq!(inst.set("nope", 1).unwrap_err().kind(), ErrorKind::Argument);
}

// =============================================================================
// Explicit Nil Default Tests
// =============================================================================

/// A non-nilable field with an explicit nil default accepts nil writes.
#[test]
fn test_explicit_nil_default_accepts_nil() {
    let (registry, _sink) = setup();
    let mut inst = account(&registry)
        .from_json(&json!({"email": "a@b.c", "handle": "ann", "limit": 5}), true)
        .unwrap();

    assert!(inst.set("limit", Value::Nil).is_ok());
    assert!(inst.set("limit", "lots").is_err());

    let wire = inst.serialize(true).unwrap();
    assert!(!wire.contains_key("limit"));
}

// =============================================================================
// Construction Tests
// =============================================================================

/// Construct applies defaults and validates provided values.
#[test]
fn test_construct() {
    let (registry, _sink) = setup();
    let ty = account(&registry);

    let inst = ty
        .construct([("email", Value::text("a@b.c")), ("handle", Value::text("ann"))])
        .unwrap();
    assert_eq!(inst.get("plan"), Some(&Value::text("free")));
    assert_eq!(inst.get("seats"), Some(&Value::Int(1)));
    assert!(inst.serialize(true).is_ok());

    let err = ty.construct([("handle", Value::text("ann"))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);

    let err = ty
        .construct([("email", Value::text("a@b.c")), ("seats", Value::Int(-2))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);

    let err = ty
        .construct([("email", Value::text("a@b.c")), ("colour", Value::text("red"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

/// A factory whose result fails the setter check is rejected at construction.
#[test]
fn test_factory_result_is_validated() {
    let registry = SchemaRegistry::new();
    let ty = registry
        .define(
            SchemaBuilder::new("Broken")
                .field_with(
                    "count",
                    TypeDescriptor::integer(),
                    FieldOptions::new().with_factory(|| Value::text("many")),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = ty.construct(Vec::<(&str, Value)>::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

// =============================================================================
// Definition Tests
// =============================================================================

/// Definition-time option conflicts.
#[test]
fn test_invalid_option_combinations() {
    let both = SchemaBuilder::new("A")
        .field_with(
            "n",
            TypeDescriptor::integer(),
            FieldOptions::new().with_default(1).with_factory(|| Value::Int(2)),
        )
        .build();
    assert_eq!(both.unwrap_err().kind(), ErrorKind::SchemaDefinition);

    let not_nilable = SchemaBuilder::new("B")
        .field_with("n", TypeDescriptor::integer(), FieldOptions::new().raise_on_nil_write())
        .build();
    assert_eq!(not_nilable.unwrap_err().kind(), ErrorKind::SchemaDefinition);

    let bad_default = SchemaBuilder::new("C")
        .field_with("n", TypeDescriptor::integer(), FieldOptions::new().with_default("x"))
        .build();
    assert!(bad_default.unwrap_err().to_string().contains("invalid default"));

    let shared_key = SchemaBuilder::new("D")
        .field_with("a", TypeDescriptor::text(), FieldOptions::new().wire_key("k"))
        .field_with("b", TypeDescriptor::text(), FieldOptions::new().wire_key("k"))
        .build();
    assert_eq!(shared_key.unwrap_err().kind(), ErrorKind::SchemaDefinition);
}
