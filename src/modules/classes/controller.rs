use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::classes::{
    Class, ClassFilterParams, ClassRoster, CreateClassDto, PaginatedClassesResponse,
    UpdateClassDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireClassesCreate, RequireClassesDelete, RequireClassesRead, RequireClassesUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{StudentScope, own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::ClassService;

#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 400, description = "Duplicate name and section, or teacher of another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn create_class(
    State(state): State<AppState>,
    RequireClassesCreate(auth_user): RequireClassesCreate,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<Class>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let class = ClassService::create_class(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassFilterParams),
    responses(
        (status = 200, description = "Paginated list of classes", body = PaginatedClassesResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn get_classes(
    State(state): State<AppState>,
    RequireClassesRead(auth_user): RequireClassesRead,
    filters: Result<Query<ClassFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedClassesResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;

    let page = ClassService::list_classes(&state.db, scope, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class details", body = Class),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn get_class(
    State(state): State<AppState>,
    RequireClassesRead(auth_user): RequireClassesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Class>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let class = ClassService::get_class(&state.db, id, scope).await?;
    Ok(Json(class))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}/students",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class with its enrolled students", body = ClassRoster),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn get_class_roster(
    State(state): State<AppState>,
    RequireClassesRead(auth_user): RequireClassesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<ClassRoster>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let roster = ClassService::get_roster(&state.db, id, scope, &students).await?;
    Ok(Json(roster))
}

#[utoipa::path(
    patch,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 400, description = "Duplicate name and section, or teacher of another school"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn update_class(
    State(state): State<AppState>,
    RequireClassesUpdate(auth_user): RequireClassesUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateClassDto>,
) -> Result<Json<Class>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let class = ClassService::update_class(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(class))
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn delete_class(
    State(state): State<AppState>,
    RequireClassesDelete(auth_user): RequireClassesDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    ClassService::delete_class(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
