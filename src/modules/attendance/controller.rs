use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::attendance::{
    AttendanceFilterParams, AttendanceRecord, AttendanceSummary, AttendanceSummaryParams,
    MarkAttendanceDto, MarkAttendanceResponse, PaginatedAttendanceResponse, UpdateAttendanceDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireAttendanceDelete, RequireAttendanceMark, RequireAttendanceRead, RequireAttendanceUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{StudentScope, own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::AttendanceService;

#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendanceDto,
    responses(
        (status = 200, description = "Attendance marked for the class", body = MarkAttendanceResponse),
        (status = 400, description = "Class of another school, unenrolled student or future date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    RequireAttendanceMark(auth_user): RequireAttendanceMark,
    ValidatedJson(dto): ValidatedJson<MarkAttendanceDto>,
) -> Result<Json<MarkAttendanceResponse>, AppError> {
    let school_id = own_school_id(&auth_user)?;
    let response =
        AttendanceService::mark_attendance(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilterParams),
    responses(
        (status = 200, description = "Paginated attendance records", body = PaginatedAttendanceResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn get_attendance(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    filters: Result<Query<AttendanceFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedAttendanceResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let page = AttendanceService::list_attendance(&state.db, scope, &students, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(AttendanceSummaryParams),
    responses(
        (status = 200, description = "Counts per status and attendance rate", body = AttendanceSummary),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn get_attendance_summary(
    State(state): State<AppState>,
    RequireAttendanceRead(auth_user): RequireAttendanceRead,
    params: Result<Query<AttendanceSummaryParams>, QueryRejection>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, params.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let summary = AttendanceService::summary(&state.db, scope, &students, params).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    patch,
    path = "/api/attendance/{id}",
    params(("id" = Uuid, Path, description = "Attendance record ID")),
    request_body = UpdateAttendanceDto,
    responses(
        (status = 200, description = "Attendance record updated", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance record not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn update_attendance(
    State(state): State<AppState>,
    RequireAttendanceUpdate(auth_user): RequireAttendanceUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAttendanceDto>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let record =
        AttendanceService::update_attendance(&state.db, auth_user.user_id()?, id, scope, dto)
            .await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id" = Uuid, Path, description = "Attendance record ID")),
    responses(
        (status = 204, description = "Attendance record deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance record not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn delete_attendance(
    State(state): State<AppState>,
    RequireAttendanceDelete(auth_user): RequireAttendanceDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    AttendanceService::delete_attendance(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
