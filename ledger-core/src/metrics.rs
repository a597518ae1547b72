//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the ledger, kept in a per-instance
//! registry so several ledgers can live in one process.
//!
//! # Metrics
//!
//! - `points_credits_total` - Credits appended
//! - `points_spends_total` - Successful spends
//! - `points_spends_rejected_total` - Spends refused for insufficient points
//! - `points_spent_total` - Points requested by successful spends
//! - `points_storage_errors_total` - Operations that failed in the store
//! - `points_spend_duration_seconds` - Histogram of spend latencies

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Credits appended
    pub credits_total: IntCounter,

    /// Successful spends
    pub spends_total: IntCounter,

    /// Spends refused for insufficient points
    pub spends_rejected: IntCounter,

    /// Points requested by successful spends
    pub points_spent: IntCounter,

    /// Store failures
    pub storage_errors: IntCounter,

    /// Spend duration histogram
    pub spend_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let credits_total = register_int_counter_with_registry!(
            "points_credits_total",
            "Total number of credits appended",
            registry
        )?;

        let spends_total = register_int_counter_with_registry!(
            "points_spends_total",
            "Total number of successful spends",
            registry
        )?;

        let spends_rejected = register_int_counter_with_registry!(
            "points_spends_rejected_total",
            "Spends refused because the global total was too low",
            registry
        )?;

        let points_spent = register_int_counter_with_registry!(
            "points_spent_total",
            "Points requested by successful spends",
            registry
        )?;

        let storage_errors = register_int_counter_with_registry!(
            "points_storage_errors_total",
            "Operations that failed in the transaction store",
            registry
        )?;

        let spend_duration = register_histogram_with_registry!(
            HistogramOpts::new(
                "points_spend_duration_seconds",
                "Histogram of spend latencies"
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
            registry
        )?;

        Ok(Self {
            credits_total,
            spends_total,
            spends_rejected,
            points_spent,
            storage_errors,
            spend_duration,
            registry: Arc::new(registry),
        })
    }

    /// Record credit
    pub fn record_credit(&self) {
        self.credits_total.inc();
    }

    /// Record a successful spend
    pub fn record_spend(&self, points: i64, duration_seconds: f64) {
        self.spends_total.inc();
        self.points_spent.inc_by(points.max(0) as u64);
        self.spend_duration.observe(duration_seconds);
    }

    /// Record a spend refused for insufficient points
    pub fn record_spend_rejected(&self) {
        self.spends_rejected.inc();
    }

    /// Record a store failure
    pub fn record_storage_error(&self) {
        self.storage_errors.inc();
    }

    /// Render in the Prometheus text exposition format
    pub fn export(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("credits_total", &self.credits_total.get())
            .field("spends_total", &self.spends_total.get())
            .field("spends_rejected", &self.spends_rejected.get())
            .finish()
    }
}
