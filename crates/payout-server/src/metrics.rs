use payout::{AttemptOutcome, Outcome};
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::LazyLock;

pub static DISPATCH_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "payout_dispatch_total",
        "Total withdrawal dispatches",
        &["result"]
    )
    .unwrap()
});

pub static DISPATCH_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "payout_dispatch_duration_seconds",
        "Withdrawal dispatch latency in seconds",
        &["result"],
        vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap()
});

pub static ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "payout_attempts_total",
        "Contract call attempts by method and outcome",
        &["method", "result"]
    )
    .unwrap()
});

/// Record one finished dispatch.
pub fn record_dispatch(result: &str, elapsed_secs: f64, attempts: &[AttemptOutcome]) {
    DISPATCH_REQUESTS.with_label_values(&[result]).inc();
    DISPATCH_LATENCY
        .with_label_values(&[result])
        .observe(elapsed_secs);
    for attempt in attempts {
        let outcome = match &attempt.outcome {
            Outcome::Success { .. } => "success",
            Outcome::Failure(f) => f.kind.as_str(),
        };
        ATTEMPTS
            .with_label_values(&[attempt.method.as_str(), outcome])
            .inc();
    }
}

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
