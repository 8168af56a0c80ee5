use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::notices::{
    CreateNoticeDto, Notice, NoticeFilterParams, PaginatedNoticesResponse, UpdateNoticeDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireNoticesCreate, RequireNoticesDelete, RequireNoticesRead, RequireNoticesUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::{NoticeService, NoticeVisibility};

/// Publish a notice to the caller's school.
#[utoipa::path(
    post,
    path = "/api/notices",
    request_body = CreateNoticeDto,
    responses(
        (status = 201, description = "Notice published", body = Notice),
        (status = 400, description = "Class belongs to another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only school admins and teachers publish notices"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Notices",
    security(("bearer_auth" = []))
)]
pub async fn create_notice(
    State(state): State<AppState>,
    RequireNoticesCreate(auth_user): RequireNoticesCreate,
    ValidatedJson(dto): ValidatedJson<CreateNoticeDto>,
) -> Result<(StatusCode, Json<Notice>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let notice =
        NoticeService::create_notice(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

/// Without an explicit `audience` the list holds every audience visible to
/// the caller's role.
#[utoipa::path(
    get,
    path = "/api/notices",
    params(NoticeFilterParams),
    responses(
        (status = 200, description = "Paginated list of notices", body = PaginatedNoticesResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Notices",
    security(("bearer_auth" = []))
)]
pub async fn get_notices(
    State(state): State<AppState>,
    RequireNoticesRead(auth_user): RequireNoticesRead,
    filters: Result<Query<NoticeFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedNoticesResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let visibility = NoticeVisibility::for_user(&state.db, &auth_user, filters.audience).await?;

    let page = NoticeService::list_notices(&state.db, scope, &visibility, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Notice details", body = Notice),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notice not found")
    ),
    tag = "Notices",
    security(("bearer_auth" = []))
)]
pub async fn get_notice(
    State(state): State<AppState>,
    RequireNoticesRead(auth_user): RequireNoticesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Notice>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let visibility = NoticeVisibility::for_user(&state.db, &auth_user, None).await?;

    let notice = NoticeService::get_notice(&state.db, id, scope, &visibility).await?;
    Ok(Json(notice))
}

#[utoipa::path(
    patch,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    request_body = UpdateNoticeDto,
    responses(
        (status = 200, description = "Notice updated", body = Notice),
        (status = 400, description = "Class belongs to another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers may only modify their own notices"),
        (status = 404, description = "Notice not found")
    ),
    tag = "Notices",
    security(("bearer_auth" = []))
)]
pub async fn update_notice(
    State(state): State<AppState>,
    RequireNoticesUpdate(auth_user): RequireNoticesUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateNoticeDto>,
) -> Result<Json<Notice>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let notice = NoticeService::update_notice(&state.db, &auth_user, id, scope, dto).await?;
    Ok(Json(notice))
}

#[utoipa::path(
    delete,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    responses(
        (status = 204, description = "Notice deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers may only delete their own notices"),
        (status = 404, description = "Notice not found")
    ),
    tag = "Notices",
    security(("bearer_auth" = []))
)]
pub async fn delete_notice(
    State(state): State<AppState>,
    RequireNoticesDelete(auth_user): RequireNoticesDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    NoticeService::delete_notice(&state.db, &auth_user, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
