//! Bundle Lifecycle and Structure Tests
//!
//! - Concurrent first use installs exactly one bundle
//! - Self- and mutually-recursive struct references
//! - Inheritance with field override
//! - Observers see every generated read and write
//! - Registry definition rules

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use fieldgen::schema::{ErrorKind, FieldObserver, FieldOptions, SchemaBuilder, TypeDescriptor};
use fieldgen::{EngineConfig, FieldError, SchemaRegistry, Value};
use serde_json::json;

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Racing first uses all end up with the same installed bundle.
#[test]
fn test_concurrent_first_use_installs_one_bundle() {
    const THREADS: usize = 8;

    let registry = SchemaRegistry::new();
    let ty = registry
        .define(
            SchemaBuilder::new("Reading")
                .field("sensor", TypeDescriptor::text())
                .field("values", TypeDescriptor::array(TypeDescriptor::float()))
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(!ty.is_synthesized());

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let ty = Arc::clone(&ty);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let doc = json!({"sensor": format!("s{}", i), "values": [1, 2.5]});
                let inst = ty.from_json(&doc, true).unwrap();
                let wire = inst.serialize(true).unwrap();
                (Arc::clone(ty.bundle()), wire)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0].0;
    for (i, (bundle, wire)) in results.iter().enumerate() {
        assert!(Arc::ptr_eq(first, bundle));
        assert_eq!(wire.get("sensor"), Some(&Value::text(format!("s{}", i))));
        assert_eq!(
            wire.get("values"),
            Some(&Value::Array(vec![Value::Float(1.0), Value::Float(2.5)]))
        );
    }

    let metrics = registry.metrics().snapshot();
    assert_eq!(metrics.bundles_synthesized, 1);
    assert!(metrics.bundle_races_lost < THREADS as u64);
    assert_eq!(metrics.deserializations, THREADS as u64);
}

// =============================================================================
// Recursive Structure Tests
// =============================================================================

/// A struct may contain arrays of itself.
#[test]
fn test_self_recursive_struct() {
    let registry = SchemaRegistry::new();
    let node = registry
        .define(
            SchemaBuilder::new("Node")
                .field("label", TypeDescriptor::text())
                .field_with(
                    "children",
                    TypeDescriptor::array(TypeDescriptor::struct_ref("Node")),
                    FieldOptions::new().with_default(Vec::<Value>::new()),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    let doc = json!({
        "label": "root",
        "children": [
            {"label": "a", "children": [{"label": "a1", "children": []}]},
            {"label": "b", "children": []}
        ]
    });
    let tree = node.from_json(&doc, true).unwrap();
    let wire = tree.serialize(true).unwrap();
    assert_eq!(serde_json::Value::Object(wire.to_json().unwrap()), doc);

    let leaf = tree.get("children").and_then(|c| c.as_array()).unwrap()[0]
        .as_struct()
        .and_then(|a| a.get("children"))
        .and_then(|c| c.as_array())
        .map(|c| c[0].clone())
        .unwrap();
    assert_eq!(leaf.as_struct().and_then(|l| l.get("label")), Some(&Value::text("a1")));
}

/// Two structs may reference each other; definition order does not matter.
#[test]
fn test_mutually_recursive_structs() {
    let registry = SchemaRegistry::new();
    let person = registry
        .define(
            SchemaBuilder::new("Person")
                .field("name", TypeDescriptor::text())
                .field("employer", TypeDescriptor::nilable(TypeDescriptor::struct_ref("Company")))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .define(
            SchemaBuilder::new("Company")
                .field("title", TypeDescriptor::text())
                .field("founder", TypeDescriptor::nilable(TypeDescriptor::struct_ref("Person")))
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(registry.check_references().is_ok());

    let doc = json!({
        "name": "Ada",
        "employer": {"title": "Engines Ltd", "founder": {"name": "Charles"}}
    });
    let inst = person.from_json(&doc, true).unwrap();
    assert_eq!(
        serde_json::Value::Object(inst.serialize(true).unwrap().to_json().unwrap()),
        doc
    );
}

/// A reference to a struct that was never defined fails at first use.
#[test]
fn test_unresolved_reference() {
    let registry = SchemaRegistry::new();
    let orphan = registry
        .define(
            SchemaBuilder::new("Orphan")
                .field("parent", TypeDescriptor::nilable(TypeDescriptor::struct_ref("Ghost")))
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(orphan.from_json(&json!({}), true).is_ok());
    let err = orphan.from_json(&json!({"parent": {}}), true).unwrap_err();
    assert!(matches!(err, FieldError::UnresolvedStruct { ref name } if name == "Ghost"));
    assert_eq!(err.kind(), ErrorKind::UnresolvedStruct);
}

// =============================================================================
// Inheritance Tests
// =============================================================================

/// A derived schema overrides an inherited field in place.
#[test]
fn test_inheritance_with_override() {
    let registry = SchemaRegistry::new();
    let base_schema = SchemaBuilder::new("Shape")
        .field("id", TypeDescriptor::text())
        .field_with("kind", TypeDescriptor::text(), FieldOptions::new().with_default("shape"))
        .build()
        .unwrap();
    registry.define(base_schema.clone()).unwrap();

    let circle = registry
        .define(
            SchemaBuilder::new("Circle")
                .inherit(&base_schema)
                .field_with("kind", TypeDescriptor::text(), FieldOptions::new().with_default("circle"))
                .field("radius", TypeDescriptor::float())
                .build()
                .unwrap(),
        )
        .unwrap();

    let names: Vec<&str> = circle.schema().fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "kind", "radius"]);

    let c = circle
        .construct([("id", Value::text("c1")), ("radius", Value::Float(2.0))])
        .unwrap();
    assert_eq!(c.get("kind"), Some(&Value::text("circle")));
    assert!(c.is_a("Shape"));
    assert!(c.is_a("Circle"));

    // A Shape-typed slot accepts a Circle and serializes it as a Circle
    let holder = registry
        .define(
            SchemaBuilder::new("Canvas")
                .field("main", TypeDescriptor::struct_ref("Shape"))
                .build()
                .unwrap(),
        )
        .unwrap();
    let canvas = holder.construct([("main", Value::from(c))]).unwrap();
    let wire = canvas.serialize(true).unwrap();
    assert_eq!(
        serde_json::Value::Object(wire.to_json().unwrap()),
        json!({"main": {"id": "c1", "kind": "circle", "radius": 2.0}})
    );

    // Deserialized by declared type: the subtype's own field lands in extras
    let back = holder.from_map(&wire, false).unwrap();
    let main = back.get("main").and_then(Value::as_struct).unwrap();
    assert_eq!(main.type_name(), "Shape");
    assert_eq!(main.extra_fields().and_then(|e| e.get("radius")), Some(&Value::Float(2.0)));
}

// =============================================================================
// Observer Tests
// =============================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl FieldObserver for Recorder {
    fn on_read(&self, struct_name: &str, field: &str, _value: &Value) {
        self.events.lock().unwrap().push(format!("read {}.{}", struct_name, field));
    }

    fn on_write(&self, struct_name: &str, field: &str, _value: &Value) {
        self.events.lock().unwrap().push(format!("write {}.{}", struct_name, field));
    }
}

/// Generated routines and setters report every field access.
#[test]
fn test_observer_sees_reads_and_writes() {
    let recorder = Arc::new(Recorder::default());
    let registry = SchemaRegistry::new();
    let ty = registry
        .define(
            SchemaBuilder::new("Pair")
                .field("left", TypeDescriptor::integer())
                .field("right", TypeDescriptor::nilable(TypeDescriptor::integer()))
                .observer(recorder.clone())
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut inst = ty.from_json(&json!({"left": 1}), true).unwrap();
    assert_eq!(
        recorder.events.lock().unwrap().drain(..).collect::<Vec<_>>(),
        vec!["write Pair.left", "write Pair.right"]
    );

    inst.set("right", 2).unwrap();
    inst.serialize(true).unwrap();
    assert_eq!(
        recorder.events.lock().unwrap().drain(..).collect::<Vec<_>>(),
        vec!["write Pair.right", "read Pair.left", "read Pair.right"]
    );
}

// =============================================================================
// Registry Tests
// =============================================================================

/// Each struct name is defined once.
#[test]
fn test_redefinition_is_rejected() {
    let registry = SchemaRegistry::new();
    let schema = SchemaBuilder::new("Once")
        .field("v", TypeDescriptor::bool())
        .build()
        .unwrap();
    registry.define(schema.clone()).unwrap();
    let err = registry.define(schema).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
}

/// Eager synthesis builds the bundle at definition.
#[test]
fn test_eager_synthesis() {
    let config = EngineConfig {
        eager_synthesis: true,
        ..EngineConfig::default()
    };
    let registry = SchemaRegistry::with_config(config);
    let ty = registry
        .define(
            SchemaBuilder::new("Eager")
                .field("v", TypeDescriptor::bool())
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(ty.is_synthesized());
    assert_eq!(registry.metrics().bundles_synthesized(), 1);
}
