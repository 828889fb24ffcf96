//! Metrics collection for observability
//!
//! Prometheus metrics for settlement computations, kept in a registry
//! owned by the engine.
//!
//! # Metrics
//!
//! - `settlement_computations_total` - Computations started
//! - `settlement_failures_total{kind}` - Failed settlement and balance requests by error kind
//! - `settlement_payments_per_computation` - Histogram of payment counts
//! - `settlement_invariant_violations_total` - Internal consistency faults

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Computations started
    pub computations_total: IntCounter,

    /// Failures by error kind
    pub failures_total: IntCounterVec,

    /// Payments emitted per successful computation
    pub payments_per_computation: Histogram,

    /// Invariant violations detected
    pub invariant_violations: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let computations_total = IntCounter::new(
            "settlement_computations_total",
            "Total number of settlement computations",
        )?;
        registry.register(Box::new(computations_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new(
                "settlement_failures_total",
                "Failed settlement and balance requests by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let payments_per_computation = Histogram::with_opts(
            HistogramOpts::new(
                "settlement_payments_per_computation",
                "Number of payments produced by one computation",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(payments_per_computation.clone()))?;

        let invariant_violations = IntCounter::new(
            "settlement_invariant_violations_total",
            "Internal consistency faults detected during settlement",
        )?;
        registry.register(Box::new(invariant_violations.clone()))?;

        Ok(Self {
            computations_total,
            failures_total,
            payments_per_computation,
            invariant_violations,
            registry,
        })
    }

    /// Record a computation start
    pub fn record_computation(&self) {
        self.computations_total.inc();
    }

    /// Record a successful computation
    pub fn record_success(&self, payment_count: usize) {
        self.payments_per_computation.observe(payment_count as f64);
    }

    /// Record a failed settlement or balance request
    pub fn record_failure(&self, err: &crate::Error) {
        self.failures_total.with_label_values(&[err.kind()]).inc();
        if matches!(err, crate::Error::InvariantViolation(_)) {
            self.invariant_violations.inc();
        }
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Metrics(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("computations_total", &self.computations_total.get())
            .field("invariant_violations", &self.invariant_violations.get())
            .finish_non_exhaustive()
    }
}
