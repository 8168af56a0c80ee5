use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    delete_attendance, get_attendance, get_attendance_summary, mark_attendance, update_attendance,
};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", post(mark_attendance).get(get_attendance))
        .route("/summary", get(get_attendance_summary))
        .route("/{id}", patch(update_attendance).delete(delete_attendance))
}
