//! Prometheus metrics: HTTP request counters and business events.

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};

use crate::is_observability_enabled;

pub type MetricsHandle = PrometheusHandle;

const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Installs the Prometheus recorder and its upkeep task.
///
/// Returns `Ok(None)` when observability is disabled at runtime.
pub fn init_metrics() -> anyhow::Result<Option<MetricsHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            HTTP_DURATION_BUCKETS,
        )?
        .install_recorder()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// `GET /metrics` in Prometheus text format.
pub fn metrics_router(handle: MetricsHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);
    gauge!("http_requests_active").decrement(1.0);

    response
}

pub fn track_user_created(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_created_total", "role" => role.to_string()).increment(1);
}

pub fn track_user_login_success(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "role" => role.to_string(), "status" => "success").increment(1);
}

pub fn track_user_login_failure(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "failure", "reason" => reason.to_string()).increment(1);
}

pub fn track_jwt_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("jwt_tokens_issued_total").increment(1);
}

pub fn track_school_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("schools_created_total").increment(1);
}

pub fn track_notice_published(audience: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("notices_published_total", "audience" => audience.to_string()).increment(1);
}

pub fn track_payment_recorded(amount_cents: i64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("fee_payments_total").increment(1);
    counter!("fee_payments_cents_total").increment(amount_cents.max(0) as u64);
}

pub fn track_attendance_marked(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("attendance_records_marked_total").increment(count as u64);
}

pub fn track_results_recorded(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("exam_results_recorded_total").increment(count as u64);
}

pub fn track_rate_limited(bucket: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("rate_limited_requests_total", "bucket" => bucket.to_string()).increment(1);
}
