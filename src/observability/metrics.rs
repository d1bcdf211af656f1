//! Conversion counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics; exactness across threads is eventual

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every bundle of one registry
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    bundles_synthesized: AtomicU64,
    bundle_races_lost: AtomicU64,
    serializations: AtomicU64,
    deserializations: AtomicU64,
    defaults_applied: AtomicU64,
    validation_failures: AtomicU64,
    extra_field_bags: AtomicU64,
    suppressed_missing: AtomicU64,
}

impl ConversionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_bundles_synthesized(&self) {
        self.bundles_synthesized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bundle_races_lost(&self) {
        self.bundle_races_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_serializations(&self) {
        self.serializations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deserializations(&self) {
        self.deserializations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_defaults_applied(&self, count: u64) {
        self.defaults_applied.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_extra_field_bags(&self) {
        self.extra_field_bags.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_suppressed_missing(&self) {
        self.suppressed_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bundles_synthesized(&self) -> u64 {
        self.bundles_synthesized.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bundles_synthesized: self.bundles_synthesized.load(Ordering::Relaxed),
            bundle_races_lost: self.bundle_races_lost.load(Ordering::Relaxed),
            serializations: self.serializations.load(Ordering::Relaxed),
            deserializations: self.deserializations.load(Ordering::Relaxed),
            defaults_applied: self.defaults_applied.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            extra_field_bags: self.extra_field_bags.load(Ordering::Relaxed),
            suppressed_missing: self.suppressed_missing.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub bundles_synthesized: u64,
    pub bundle_races_lost: u64,
    pub serializations: u64,
    pub deserializations: u64,
    pub defaults_applied: u64,
    pub validation_failures: u64,
    pub extra_field_bags: u64,
    pub suppressed_missing: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
