use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "dm_service_http_requests_total",
            "Total HTTP requests handled by dm-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create dm_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register dm_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "dm_service_http_request_duration_seconds",
            "HTTP request latencies for dm-service",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["method", "path", "status"],
    )
    .expect("failed to create dm_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register dm_service_http_request_duration_seconds");
    histogram
});

pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "dm_service_messages_sent_total",
        "Messages durably persisted by the delivery engine",
    )
    .expect("failed to create dm_service_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register dm_service_messages_sent_total");
    counter
});

static PUSH_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "dm_service_push_events_total",
            "Events delivered to live push connections, by event type",
        ),
        &["event"],
    )
    .expect("failed to create dm_service_push_events_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register dm_service_push_events_total");
    counter
});

pub static SUMMARY_PAIR_DIVERGENCE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "dm_service_summary_pair_divergence_total",
        "Conversation summary pairs left divergent by a failed second write",
    )
    .expect("failed to create dm_service_summary_pair_divergence_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register dm_service_summary_pair_divergence_total");
    counter
});

pub fn inc_push_event(event: &str) {
    PUSH_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path, &status])
        .observe(start.elapsed().as_secs_f64());
    response
}

pub fn render() -> String {
    let metric_families = prometheus::gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
