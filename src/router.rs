use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use scholaris_observability::{logging_middleware, metrics_middleware};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::modules::attendance::router::init_attendance_router;
use crate::modules::audit_logs::router::init_audit_logs_router;
use crate::modules::auth::router::init_auth_router;
use crate::modules::classes::router::init_classes_router;
use crate::modules::dashboard::router::init_dashboard_router;
use crate::modules::exams::router::{init_exams_router, init_results_router};
use crate::modules::fees::router::init_fees_router;
use crate::modules::messages::router::init_messages_router;
use crate::modules::notices::router::init_notices_router;
use crate::modules::parents::router::init_parents_router;
use crate::modules::schools::router::init_schools_router;
use crate::modules::students::router::init_students_router;
use crate::modules::teachers::router::init_teachers_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", init_auth_router())
        .nest("/schools", init_schools_router())
        .nest("/users", init_users_router())
        .nest("/classes", init_classes_router())
        .nest("/teachers", init_teachers_router())
        .nest("/students", init_students_router())
        .nest("/parents", init_parents_router())
        .nest("/notices", init_notices_router())
        .nest("/exams", init_exams_router())
        .nest("/results", init_results_router())
        .nest("/fees", init_fees_router())
        .nest("/attendance", init_attendance_router())
        .nest("/messages", init_messages_router())
        .nest("/audit-logs", init_audit_logs_router())
        .nest("/dashboard", init_dashboard_router())
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allow_origin = if state.cors_config.allows_any() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = state
            .cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    let layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    // Credentials cannot be combined with a wildcard origin.
    if state.cors_config.allows_any() {
        layer
    } else {
        layer.allow_credentials(true)
    }
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors_layer(&state))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
