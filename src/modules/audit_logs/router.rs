use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::list_audit_logs;

pub fn init_audit_logs_router() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}
