//! Prometheus metrics for habit-service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    plans_total: IntCounterVec,
    errors_total: IntCounterVec,
    inference_tokens_total: IntCounterVec,
    inference_latency_seconds: HistogramVec,
    store_write_duration_seconds: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS.get().is_some() {
        return;
    }

    match build_metrics() {
        Ok(metrics) => {
            if METRICS.set(metrics).is_ok() {
                tracing::info!("Prometheus metrics initialized");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to initialize Prometheus metrics"),
    }
}

fn build_metrics() -> Result<Metrics, prometheus::Error> {
    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;

    let http_request_duration_seconds = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "path"],
    )?;

    let plans_total = IntCounterVec::new(
        Opts::new("habit_plans_total", "Plan requests by outcome"),
        &["outcome"],
    )?;

    let errors_total = IntCounterVec::new(
        Opts::new("habit_errors_total", "Failed plan requests by error kind"),
        &["kind"],
    )?;

    let inference_tokens_total = IntCounterVec::new(
        Opts::new("habit_inference_tokens_total", "Tokens processed by the model"),
        &["model", "type"], // type: input, output
    )?;

    let inference_latency_seconds = HistogramVec::new(
        HistogramOpts::new(
            "habit_inference_latency_seconds",
            "Inference provider latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )?;

    let store_write_duration_seconds = HistogramVec::new(
        HistogramOpts::new(
            "habit_store_write_duration_seconds",
            "Plan store write duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["store"],
    )?;

    registry.register(Box::new(http_requests_total.clone()))?;
    registry.register(Box::new(http_request_duration_seconds.clone()))?;
    registry.register(Box::new(plans_total.clone()))?;
    registry.register(Box::new(errors_total.clone()))?;
    registry.register(Box::new(inference_tokens_total.clone()))?;
    registry.register(Box::new(inference_latency_seconds.clone()))?;
    registry.register(Box::new(store_write_duration_seconds.clone()))?;

    Ok(Metrics {
        registry,
        http_requests_total,
        http_request_duration_seconds,
        plans_total,
        errors_total,
        inference_tokens_total,
        inference_latency_seconds,
        store_write_duration_seconds,
    })
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let metrics = match METRICS.get() {
        Some(m) => m,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

pub fn record_http_request(method: &str, path: &str, status: &str, duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.http_requests_total
            .with_label_values(&[method, path, status])
            .inc();
        m.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Record a successfully stored plan.
pub fn record_plan_created() {
    if let Some(m) = METRICS.get() {
        m.plans_total.with_label_values(&["created"]).inc();
    }
}

/// Record a failed plan request by error kind.
pub fn record_plan_error(kind: &str) {
    if let Some(m) = METRICS.get() {
        m.plans_total.with_label_values(&["failed"]).inc();
        m.errors_total.with_label_values(&[kind]).inc();
    }
}

pub fn record_tokens(model: &str, input_tokens: u64, output_tokens: u64) {
    if let Some(m) = METRICS.get() {
        m.inference_tokens_total
            .with_label_values(&[model, "input"])
            .inc_by(input_tokens);
        m.inference_tokens_total
            .with_label_values(&[model, "output"])
            .inc_by(output_tokens);
    }
}

pub fn record_inference_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.inference_latency_seconds
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

pub fn record_store_write(duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.store_write_duration_seconds
            .with_label_values(&["mongodb"])
            .observe(duration_secs);
    }
}
