use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_fee, delete_fee, get_fee, get_fee_summary, get_fees, record_payment, update_fee,
};

pub fn init_fees_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_fee).get(get_fees))
        .route("/summary", get(get_fee_summary))
        .route("/{id}", get(get_fee).patch(update_fee).delete(delete_fee))
        .route("/{id}/payments", post(record_payment))
}
