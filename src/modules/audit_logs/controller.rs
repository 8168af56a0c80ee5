use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use scholaris_core::AppError;
use scholaris_models::audit::{AuditLogFilterParams, PaginatedAuditLogsResponse};

use crate::middleware::auth::RequireAuditLogsRead;
use crate::state::AppState;
use crate::utils::auth_helpers::read_scope;

use super::service::AuditService;

#[utoipa::path(
    get,
    path = "/api/audit-logs",
    params(AuditLogFilterParams),
    responses(
        (status = 200, description = "Audit trail, newest first", body = PaginatedAuditLogsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Audit Logs",
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    RequireAuditLogsRead(auth_user): RequireAuditLogsRead,
    filters: Result<Query<AuditLogFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedAuditLogsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;

    let logs = AuditService::list_logs(&state.db, scope, filters).await?;
    Ok(Json(logs))
}
