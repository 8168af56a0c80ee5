use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_exam, delete_exam, get_exam, get_exam_results, get_exams, get_results, record_results,
    update_exam,
};

pub fn init_exams_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exam).get(get_exams))
        .route("/{id}", get(get_exam).patch(update_exam).delete(delete_exam))
        .route("/{id}/results", post(record_results).get(get_exam_results))
}

/// Mounted at `/api/results`.
pub fn init_results_router() -> Router<AppState> {
    Router::new().route("/", get(get_results))
}
