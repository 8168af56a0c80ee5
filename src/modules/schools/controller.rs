use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::schools::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolWithStats,
    UpdateSchoolDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireSchoolsCreate, RequireSchoolsDelete, RequireSchoolsRead, RequireSchoolsUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::read_scope;
use crate::validator::ValidatedJson;

use super::service::SchoolService;

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Duplicate name or code"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super admin only"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn create_school(
    State(state): State<AppState>,
    RequireSchoolsCreate(auth_user): RequireSchoolsCreate,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let school = SchoolService::create_school(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/schools",
    params(SchoolFilterParams),
    responses(
        (status = 200, description = "Paginated list of schools", body = PaginatedSchoolsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn get_schools(
    State(state): State<AppState>,
    RequireSchoolsRead(auth_user): RequireSchoolsRead,
    filters: Result<Query<SchoolFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedSchoolsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, None)?;

    let schools = SchoolService::list_schools(&state.db, scope, filters).await?;
    Ok(Json(schools))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 200, description = "School with head counts", body = SchoolWithStats),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn get_school(
    State(state): State<AppState>,
    RequireSchoolsRead(auth_user): RequireSchoolsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<SchoolWithStats>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let school = SchoolService::get_school(&state.db, id, scope).await?;
    Ok(Json(school))
}

#[utoipa::path(
    patch,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Duplicate name or code"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn update_school(
    State(state): State<AppState>,
    RequireSchoolsUpdate(auth_user): RequireSchoolsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<School>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let school =
        SchoolService::update_school(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(school))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 204, description = "School and all of its data deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super admin only"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn delete_school(
    State(state): State<AppState>,
    RequireSchoolsDelete(auth_user): RequireSchoolsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    SchoolService::delete_school(&state.db, auth_user.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
