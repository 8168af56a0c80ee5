use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_parent, delete_parent, get_parent, get_parent_children, get_parents, update_parent,
};

pub fn init_parents_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_parent).get(get_parents))
        .route(
            "/{id}",
            get(get_parent).patch(update_parent).delete(delete_parent),
        )
        .route("/{id}/children", get(get_parent_children))
}
