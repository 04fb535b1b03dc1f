//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dualgate_requests_total` (counter): requests by surface, method, status
//! - `dualgate_request_duration_seconds` (histogram): latency by surface
//!
//! The Prometheus recorder is process-wide; `/metrics` on the overlay
//! surface renders it. Histogram samples are drained by an upkeep task
//! whether or not anything scrapes.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Interval between recorder upkeep runs.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Install the global Prometheus recorder once and return its handle.
///
/// Called inside a tokio runtime, this also starts the upkeep task on it.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("A metrics recorder was already installed; /metrics will be empty");
            }
            if tokio::runtime::Handle::try_current().is_ok() {
                spawn_upkeep(handle.clone(), UPKEEP_INTERVAL);
            } else {
                tracing::warn!("No runtime; metrics upkeep only runs on scrape");
            }
            handle
        })
        .clone()
}

/// Run `PrometheusHandle::run_upkeep` every `interval` until aborted.
pub fn spawn_upkeep(handle: PrometheusHandle, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
        }
    })
}

/// Record a finished request.
pub fn record_request(surface: &'static str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dualgate_requests_total",
        "surface" => surface,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dualgate_request_duration_seconds", "surface" => surface)
        .record(start.elapsed().as_secs_f64());
}

/// Middleware recording every request on the surface named by the state.
pub async fn track_requests(
    State(surface): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(surface, &method, response.status().as_u16(), start);
    response
}
