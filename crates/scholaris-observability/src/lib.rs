//! Scholaris observability: structured logging, OpenTelemetry tracing and
//! Prometheus metrics.
//!
//! Everything heavy sits behind the `observability` feature (on by default).
//! At runtime `OBSERVABILITY_ENABLED=false` falls back to console logging and
//! turns the metric helpers into no-ops. The request logging middleware is
//! always available.
//!
//! ```no_run
//! use scholaris_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing()?;
//!     // ... serve ...
//!     shutdown_tracer().await;
//!     Ok(())
//! }
//! ```

pub mod basic_logging;
pub mod request_logging;

#[cfg(feature = "observability")]
pub mod metrics;
#[cfg(feature = "observability")]
pub mod telemetry;

pub use request_logging::{REQUEST_ID_HEADER, logging_middleware};

#[cfg(feature = "observability")]
pub use metrics::{
    MetricsHandle, init_metrics, metrics_middleware, metrics_router, track_attendance_marked,
    track_jwt_issued, track_notice_published, track_payment_recorded, track_rate_limited,
    track_results_recorded, track_school_created, track_user_created, track_user_login_failure,
    track_user_login_success,
};
#[cfg(feature = "observability")]
pub use telemetry::{init_tracing, shutdown_tracer};

#[cfg(feature = "observability")]
static OBSERVABILITY_ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

/// Reads `OBSERVABILITY_ENABLED` once. Anything but `false`/`0` enables it.
#[cfg(feature = "observability")]
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED
        .get_or_init(|| parse_enabled(std::env::var("OBSERVABILITY_ENABLED").ok().as_deref()))
}

#[cfg_attr(not(feature = "observability"), allow(dead_code))]
pub(crate) fn parse_enabled(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let v = v.trim().to_lowercase();
            v != "false" && v != "0"
        }
        None => true,
    }
}

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{Router, extract::Request, middleware::Next, response::Response};

    #[derive(Clone, Debug)]
    pub struct MetricsHandle;

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub fn init_tracing() -> anyhow::Result<()> {
        crate::basic_logging::init_basic_console_logging();
        Ok(())
    }

    pub async fn shutdown_tracer() {}

    pub fn init_metrics() -> anyhow::Result<Option<MetricsHandle>> {
        Ok(None)
    }

    pub fn metrics_router(_handle: MetricsHandle) -> Router {
        Router::new()
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub fn track_user_created(_role: &str) {}
    pub fn track_user_login_success(_role: &str) {}
    pub fn track_user_login_failure(_reason: &str) {}
    pub fn track_jwt_issued() {}
    pub fn track_school_created() {}
    pub fn track_notice_published(_audience: &str) {}
    pub fn track_payment_recorded(_amount_cents: i64) {}
    pub fn track_attendance_marked(_count: usize) {}
    pub fn track_results_recorded(_count: usize) {}
    pub fn track_rate_limited(_bucket: &str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enabled() {
        assert!(parse_enabled(None));
        assert!(parse_enabled(Some("true")));
        assert!(parse_enabled(Some("yes")));
        assert!(!parse_enabled(Some("false")));
        assert!(!parse_enabled(Some(" FALSE ")));
        assert!(!parse_enabled(Some("0")));
    }
}
