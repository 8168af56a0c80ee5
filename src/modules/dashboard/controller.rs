use axum::{Json, extract::State};
use scholaris_core::AppError;
use scholaris_models::dashboard::Dashboard;

use crate::middleware::auth::RequireDashboardRead;
use crate::state::AppState;

use super::service::DashboardService;

/// Summary for the caller's role; the `role` field tells the variants apart.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Role-specific dashboard", body = Dashboard),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile for the account not found")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    RequireDashboardRead(auth_user): RequireDashboardRead,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = DashboardService::for_user(&state.db, &auth_user).await?;
    Ok(Json(dashboard))
}
