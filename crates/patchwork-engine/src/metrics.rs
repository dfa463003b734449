/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! Prometheus metrics for the patchwork engine: reconciliation, dispatch,
//! tracking and notification delivery.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};

/// Global Prometheus registry for all engine metrics
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Jobs accepted by a backend
/// Labels: kind
pub static JOBS_DISPATCHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "patchwork_jobs_dispatched_total",
        "Total number of jobs accepted by a backend, by kind",
    );
    let counter =
        CounterVec::new(opts, &["kind"]).expect("Failed to create jobs dispatched counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register jobs dispatched counter");
    counter
});

/// Dispatch attempts that failed validation or submission
/// Labels: reason
pub static DISPATCH_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "patchwork_dispatch_failures_total",
        "Total number of failed dispatch attempts, by reason",
    );
    let counter =
        CounterVec::new(opts, &["reason"]).expect("Failed to create dispatch failures counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register dispatch failures counter");
    counter
});

/// Errors collected during reconciliation
pub static RECONCILE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "patchwork_reconcile_errors_total",
        "Total number of errors collected during reconciliation",
    )
    .expect("Failed to create reconcile errors counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register reconcile errors counter");
    counter
});

/// Servers written by reconciliation
pub static SERVERS_RECONCILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "patchwork_servers_reconciled_total",
        "Total number of servers written by reconciliation",
    )
    .expect("Failed to create servers reconciled counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register servers reconciled counter");
    counter
});

/// Reconciliation duration histogram
pub static RECONCILE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "patchwork_reconcile_duration_seconds",
        "Reconciliation latency distribution in seconds",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["outcome"])
        .expect("Failed to create reconcile duration histogram");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("Failed to register reconcile duration histogram");
    histogram
});

/// Tracking results
/// Labels: outcome
pub static TRACKING_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "patchwork_tracking_outcomes_total",
        "Total number of tracking attempts, by outcome",
    );
    let counter =
        CounterVec::new(opts, &["outcome"]).expect("Failed to create tracking outcomes counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register tracking outcomes counter");
    counter
});

/// Notification deliveries
/// Labels: result
pub static NOTIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "patchwork_notifications_total",
        "Total number of channel notifications, by result",
    );
    let counter =
        CounterVec::new(opts, &["result"]).expect("Failed to create notifications counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register notifications counter");
    counter
});

/// Encodes all registered metrics in Prometheus text format
///
/// # Returns
///
/// A String in the Prometheus exposition format, empty if encoding fails.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
