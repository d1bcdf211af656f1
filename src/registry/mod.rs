//! Schema registry
//!
//! Process-wide state: struct name -> [`StructType`].
//!
//! # Lifecycle
//!
//! 1. Populated at definition time, once per name (redefinition is an error)
//! 2. Read-only afterwards; entries are never removed
//! 3. Bundles are installed into their struct type on first use, or at
//!    definition when `eager_synthesis` is set
//!
//! Lookups take a read lock; invoking an installed bundle takes none.
//! [`SchemaRegistry::global`] is the process-wide instance; tools and
//! tests can create isolated registries.

mod struct_type;

pub use struct_type::StructType;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use crate::config::EngineConfig;
use crate::engine::check_descriptor;
use crate::observability::{
    log_event_with_fields, ConversionMetrics, DiagnosticSink, Event, LogSink,
};
use crate::schema::{FieldError, FieldResult, StructSchema, TypeDescriptor};

static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

/// Owner of every defined struct type
pub struct SchemaRegistry {
    this: Weak<SchemaRegistry>,
    entries: RwLock<HashMap<Arc<str>, Arc<StructType>>>,
    config: EngineConfig,
    sink: Arc<dyn DiagnosticSink>,
    metrics: Arc<ConversionMetrics>,
}

impl SchemaRegistry {
    /// Isolated registry with the default config, logging diagnostics
    pub fn new() -> Arc<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Arc<Self> {
        let sink = Arc::new(LogSink::new(config.log_soft_failures));
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: EngineConfig, sink: Arc<dyn DiagnosticSink>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            entries: RwLock::new(HashMap::new()),
            config,
            sink,
            metrics: Arc::new(ConversionMetrics::new()),
        })
    }

    /// The process-wide registry
    pub fn global() -> &'static Arc<SchemaRegistry> {
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ConversionMetrics> {
        &self.metrics
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Register a struct type.
    ///
    /// Fails if the name is taken. Struct references inside the schema are
    /// not checked here; they resolve lazily, so definition order is free.
    pub fn define(&self, schema: StructSchema) -> FieldResult<Arc<StructType>> {
        for field in schema.fields() {
            check_descriptor(field.ty())
                .map_err(|reason| FieldError::schema_definition(schema.name(), field.name(), reason))?;
        }

        let name: Arc<str> = Arc::from(schema.name());
        let ty = Arc::new(StructType::new(
            schema,
            self.this.clone(),
            Arc::clone(&self.sink),
            Arc::clone(&self.metrics),
        ));
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            if entries.contains_key(&name) {
                return Err(FieldError::schema_definition(
                    &*name,
                    "",
                    "struct type is already defined",
                ));
            }
            entries.insert(Arc::clone(&name), Arc::clone(&ty));
        }

        let fields = ty.schema().len().to_string();
        log_event_with_fields(
            Event::SchemaDefined,
            &[("struct", &*name), ("fields", fields.as_str())],
        );
        if self.config.eager_synthesis {
            ty.bundle();
        }
        Ok(ty)
    }

    pub fn get(&self, name: &str) -> Option<Arc<StructType>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is an error
    pub fn resolve(&self, name: &str) -> FieldResult<Arc<StructType>> {
        self.get(name).ok_or_else(|| FieldError::UnresolvedStruct {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Defined names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|k| k.to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every struct reference names a defined type
    pub fn check_references(&self) -> FieldResult<()> {
        let types: Vec<Arc<StructType>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for ty in types {
            for field in ty.schema().fields() {
                let mut missing = None;
                visit_struct_refs(field.ty(), &mut |name| {
                    if missing.is_none() && !self.contains(name) {
                        missing = Some(name.to_string());
                    }
                });
                if let Some(name) = missing {
                    return Err(FieldError::UnresolvedStruct { name });
                }
            }
        }
        Ok(())
    }
}

fn visit_struct_refs(ty: &TypeDescriptor, visit: &mut dyn FnMut(&str)) {
    match ty {
        TypeDescriptor::StructRef(r) => visit(r.name()),
        TypeDescriptor::Array(inner) | TypeDescriptor::Set(inner) | TypeDescriptor::Nilable(inner) => {
            visit_struct_refs(inner, visit)
        }
        TypeDescriptor::Mapping(k, v) => {
            visit_struct_refs(k, visit);
            visit_struct_refs(v, visit);
        }
        TypeDescriptor::Primitive(_) | TypeDescriptor::CustomScalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ErrorKind, SchemaBuilder};

    fn point() -> StructSchema {
        SchemaBuilder::new("Point")
            .field("x", TypeDescriptor::integer())
            .field("y", TypeDescriptor::integer())
            .build()
            .unwrap()
    }

    #[test]
    fn test_define_and_get() {
        let registry = SchemaRegistry::new();
        registry.define(point()).unwrap();
        assert!(registry.contains("Point"));
        assert_eq!(registry.names(), vec!["Point".to_string()]);
        assert!(registry.get("Nope").is_none());
        assert_eq!(
            registry.resolve("Nope").unwrap_err().kind(),
            ErrorKind::UnresolvedStruct
        );
    }

    #[test]
    fn test_redefinition_rejected() {
        let registry = SchemaRegistry::new();
        registry.define(point()).unwrap();
        let err = registry.define(point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaDefinition);
        assert!(err.to_string().contains("already defined"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lazy_synthesis() {
        let registry = SchemaRegistry::new();
        let ty = registry.define(point()).unwrap();
        assert!(!ty.is_synthesized());
        ty.bundle();
        assert!(ty.is_synthesized());
        ty.bundle();
        assert_eq!(registry.metrics().bundles_synthesized(), 1);
    }

    #[test]
    fn test_eager_synthesis() {
        let config = EngineConfig {
            eager_synthesis: true,
            ..EngineConfig::default()
        };
        let registry = SchemaRegistry::with_config(config);
        let ty = registry.define(point()).unwrap();
        assert!(ty.is_synthesized());
    }

    #[test]
    fn test_check_references() {
        let registry = SchemaRegistry::new();
        let line = SchemaBuilder::new("Line")
            .field("points", TypeDescriptor::array(TypeDescriptor::struct_ref("Point")))
            .build()
            .unwrap();
        registry.define(line).unwrap();
        assert!(matches!(
            registry.check_references(),
            Err(FieldError::UnresolvedStruct { ref name }) if name == "Point"
        ));
        registry.define(point()).unwrap();
        assert!(registry.check_references().is_ok());
    }

    #[test]
    fn test_global_is_shared() {
        let a = SchemaRegistry::global();
        let b = SchemaRegistry::global();
        assert!(Arc::ptr_eq(a, b));
    }
}
