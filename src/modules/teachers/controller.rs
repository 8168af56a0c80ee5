use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::teachers::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, TeacherFilterParams, UpdateTeacherDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireTeachersCreate, RequireTeachersDelete, RequireTeachersRead, RequireTeachersUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::TeacherService;

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher account and profile created", body = Teacher),
        (status = 400, description = "Duplicate email or employee number"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn create_teacher(
    State(state): State<AppState>,
    RequireTeachersCreate(auth_user): RequireTeachersCreate,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let teacher =
        TeacherService::create_teacher(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherFilterParams),
    responses(
        (status = 200, description = "Paginated list of teachers", body = PaginatedTeachersResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn get_teachers(
    State(state): State<AppState>,
    RequireTeachersRead(auth_user): RequireTeachersRead,
    filters: Result<Query<TeacherFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedTeachersResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;

    let teachers = TeacherService::list_teachers(&state.db, scope, filters).await?;
    Ok(Json(teachers))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher details", body = Teacher),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn get_teacher(
    State(state): State<AppState>,
    RequireTeachersRead(auth_user): RequireTeachersRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Teacher>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let teacher = TeacherService::get_teacher(&state.db, id, scope).await?;
    Ok(Json(teacher))
}

#[utoipa::path(
    patch,
    path = "/api/teachers/{id}",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 400, description = "Duplicate employee number"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn update_teacher(
    State(state): State<AppState>,
    RequireTeachersUpdate(auth_user): RequireTeachersUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherDto>,
) -> Result<Json<Teacher>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let teacher =
        TeacherService::update_teacher(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(teacher))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 204, description = "Teacher and their account deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn delete_teacher(
    State(state): State<AppState>,
    RequireTeachersDelete(auth_user): RequireTeachersDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    TeacherService::delete_teacher(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
