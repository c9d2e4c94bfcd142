use error_stack::ResultExt;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

use crate::error::ConfigurationError;

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

lazy_static! {
    pub static ref PAYMENT_STATUS_CHECKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "PAYMENT_STATUS_CHECKS_TOTAL",
        "Total number of status-check requests received",
        &["outcome"]
    )
    .unwrap();
    pub static ref GATEWAY_VERIFICATION_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "GATEWAY_VERIFICATION_CALLS_TOTAL",
        "Total number of verification calls made to the gateway",
        &["connector", "result"]
    )
    .unwrap();
    pub static ref GATEWAY_VERIFICATION_LATENCY: HistogramVec = register_histogram_vec!(
        "GATEWAY_VERIFICATION_LATENCY_SECONDS",
        "Latency of gateway verification calls",
        &["connector"],
        LATENCY_BUCKETS.to_vec()
    )
    .unwrap();
}

pub async fn metrics_handler() -> error_stack::Result<String, ConfigurationError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .change_context(ConfigurationError::MetricsServerError)?;

    String::from_utf8(buffer).change_context(ConfigurationError::MetricsServerError)
}
