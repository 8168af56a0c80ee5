use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_teacher, delete_teacher, get_teacher, get_teachers, update_teacher};

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_teacher).get(get_teachers))
        .route(
            "/{id}",
            get(get_teacher).patch(update_teacher).delete(delete_teacher),
        )
}
