use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and describe the server's metrics
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!("http_requests_total", "Total number of HTTP requests served");
    describe_histogram!(
        "http_request_duration_seconds",
        "Request duration in seconds"
    );
    describe_counter!("http_request_bytes_total", "Total request body bytes received");
    describe_counter!("http_response_bytes_total", "Total response body bytes sent");
    describe_counter!("http_render_errors_total", "Total number of failed view renders");
    describe_counter!(
        "http_request_id_failures_total",
        "Requests rejected because no identifier could be allocated"
    );
    describe_gauge!("webserver_info", "Server version information");

    gauge!("webserver_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a completed request
pub fn record_event(
    method: &str,
    route: &str,
    status: u16,
    duration: Duration,
    bytes_in: usize,
    bytes_out: usize,
) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
    )
    .record(duration.as_secs_f64());

    counter!("http_request_bytes_total", "route" => route.to_string()).increment(bytes_in as u64);
    counter!("http_response_bytes_total", "route" => route.to_string()).increment(bytes_out as u64);
}

pub fn record_render_error(view: &str) {
    counter!("http_render_errors_total", "view" => view.to_string()).increment(1);
}

pub fn record_id_failure() {
    counter!("http_request_id_failures_total").increment(1);
}
