use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_notice, delete_notice, get_notice, get_notices, update_notice};

pub fn init_notices_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_notice).get(get_notices))
        .route("/{id}", get(get_notice).patch(update_notice).delete(delete_notice))
}
