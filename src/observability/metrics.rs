use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};
use warp::Filter;

lazy_static! {
    pub static ref LOGS_PROCESSED: IntCounter = register_int_counter!(
        "logsense_logs_processed_total",
        "Logs that received a processed record"
    )
    .unwrap();
    pub static ref CLASSIFIER_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "logsense_classifier_requests_total",
        "Sentiment classifier requests by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref BATCH_FALLBACKS: IntCounter = register_int_counter!(
        "logsense_batch_fallbacks_total",
        "Batches saved with the default sentiment"
    )
    .unwrap();
    pub static ref PROCESSING_RUNS: IntCounter = register_int_counter!(
        "logsense_processing_runs_total",
        "Invocations of the process-logs operation"
    )
    .unwrap();
}

/// Text exposition of every registered metric.
pub fn render() -> (Vec<u8>, String) {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    (buffer, encoder.format_type().to_string())
}

/// Serves `/metrics` for Prometheus to scrape.
pub async fn serve_metrics(addr: SocketAddr) {
    let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
        let (body, content_type) = render();
        warp::reply::with_header(body, "Content-Type", content_type)
    });
    info!("Metrics server listening on http://{}/metrics", addr);
    warp::serve(metrics_route).run(addr).await;
}
