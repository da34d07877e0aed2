//! Translation metrics and observability module.
//!
//! This module tracks how translations are resolved and reconciled: how often
//! a cached translation is reused, how often one is loaded from the store or
//! stubbed because the language does not exist yet, how many translations
//! were pruned, and how many multi-language payloads were rejected.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Translation resolution counters.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Number of times the entity's cached translation was reused
    cache_reuses: AtomicUsize,

    /// Number of translations loaded from the store
    store_loads: AtomicUsize,

    /// Number of unsaved translation stubs created for missing languages
    stubs_created: AtomicUsize,

    /// Number of translations deleted during reconciliation
    translations_pruned: AtomicUsize,

    /// Number of multi-language payloads refused by validation
    payloads_rejected: AtomicUsize,
}

/// Global metrics instance (initialized lazily)
static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    /// Create a detached set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the global translation metrics instance.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(TranslationMetrics::new)
    }

    /// Record a reuse of the cached translation.
    pub fn record_cache_reuse(&self) {
        self.cache_reuses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a translation loaded from the store.
    pub fn record_store_load(&self) {
        self.store_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new translation stub.
    pub fn record_stub_created(&self) {
        self.stubs_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record pruned translations.
    pub fn record_pruned(&self, count: usize) {
        self.translations_pruned.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a rejected multi-language payload.
    pub fn record_payload_rejected(&self) {
        self.payloads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_reuses(&self) -> usize {
        self.cache_reuses.load(Ordering::Relaxed)
    }

    pub fn store_loads(&self) -> usize {
        self.store_loads.load(Ordering::Relaxed)
    }

    pub fn stubs_created(&self) -> usize {
        self.stubs_created.load(Ordering::Relaxed)
    }

    pub fn translations_pruned(&self) -> usize {
        self.translations_pruned.load(Ordering::Relaxed)
    }

    pub fn payloads_rejected(&self) -> usize {
        self.payloads_rejected.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let reuses = self.cache_reuses();
        let loads = self.store_loads();
        let stubs = self.stubs_created();

        let lookups = loads + stubs;
        let store_hit_rate = if lookups > 0 {
            (loads as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_reuses: reuses,
            store_loads: loads,
            stubs_created: stubs,
            store_hit_rate,
            translations_pruned: self.translations_pruned(),
            payloads_rejected: self.payloads_rejected(),
        }
    }
}

/// Metrics report containing current translation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_reuses: usize,
    pub store_loads: usize,
    pub stubs_created: usize,

    /// Share of store lookups that found an existing translation (0-100)
    pub store_hit_rate: f64,

    pub translations_pruned: usize,
    pub payloads_rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // ==================== Counter Tests ====================

    #[test]
    fn test_record_cache_reuse() {
        let metrics = TranslationMetrics::new();
        assert_eq!(metrics.cache_reuses(), 0);
        metrics.record_cache_reuse();
        metrics.record_cache_reuse();
        assert_eq!(metrics.cache_reuses(), 2);
    }

    #[test]
    fn test_record_pruned_adds_count() {
        let metrics = TranslationMetrics::new();
        metrics.record_pruned(3);
        metrics.record_pruned(0);
        metrics.record_pruned(2);
        assert_eq!(metrics.translations_pruned(), 5);
    }

    #[test]
    fn test_record_payload_rejected() {
        let metrics = TranslationMetrics::new();
        metrics.record_payload_rejected();
        assert_eq!(metrics.payloads_rejected(), 1);
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_report_empty() {
        let report = TranslationMetrics::new().report();
        assert_eq!(report.cache_reuses, 0);
        assert_eq!(report.store_loads, 0);
        assert_eq!(report.stubs_created, 0);
        assert_eq!(report.store_hit_rate, 0.0);
    }

    #[test]
    fn test_report_store_hit_rate() {
        let metrics = TranslationMetrics::new();

        // 3 loads, 1 stub = 75% hit rate
        metrics.record_store_load();
        metrics.record_store_load();
        metrics.record_store_load();
        metrics.record_stub_created();

        let report = metrics.report();
        assert_eq!(report.store_loads, 3);
        assert_eq!(report.stubs_created, 1);
        assert_eq!(report.store_hit_rate, 75.0);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = TranslationMetrics::new();
        metrics.record_stub_created();
        let json = serde_json::to_value(metrics.report()).unwrap();
        assert_eq!(json["stubs_created"], 1);
        assert_eq!(json["store_hit_rate"], 0.0);
    }

    // ==================== Singleton Tests ====================

    #[test]
    fn test_global_returns_same_instance() {
        let metrics1 = TranslationMetrics::global();
        let metrics2 = TranslationMetrics::global();
        assert!(std::ptr::eq(metrics1, metrics2));
    }

    #[test]
    #[serial]
    fn test_global_metrics_persist_across_calls() {
        // Other tests record into the global counters concurrently, so only
        // monotonic growth is checked here
        let initial = TranslationMetrics::global().stubs_created();
        TranslationMetrics::global().record_stub_created();
        assert!(TranslationMetrics::global().stubs_created() > initial);
    }
}
