use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::parents::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentFilterParams, UpdateParentDto,
};
use scholaris_models::students::Student;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireParentsCreate, RequireParentsDelete, RequireParentsRead, RequireParentsUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::{ParentScope, ParentService};

#[utoipa::path(
    post,
    path = "/api/parents",
    request_body = CreateParentDto,
    responses(
        (status = 201, description = "Parent account and profile created", body = Parent),
        (status = 400, description = "Email already in use"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn create_parent(
    State(state): State<AppState>,
    RequireParentsCreate(auth_user): RequireParentsCreate,
    ValidatedJson(dto): ValidatedJson<CreateParentDto>,
) -> Result<(StatusCode, Json<Parent>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let parent =
        ParentService::create_parent(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(parent)))
}

#[utoipa::path(
    get,
    path = "/api/parents",
    params(ParentFilterParams),
    responses(
        (status = 200, description = "Paginated list of parents", body = PaginatedParentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn get_parents(
    State(state): State<AppState>,
    RequireParentsRead(auth_user): RequireParentsRead,
    filters: Result<Query<ParentFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedParentsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let parents = ParentScope::for_user(&state.db, &auth_user).await?;

    let page = ParentService::list_parents(&state.db, scope, parents, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Parent details", body = Parent),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn get_parent(
    State(state): State<AppState>,
    RequireParentsRead(auth_user): RequireParentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Parent>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let parents = ParentScope::for_user(&state.db, &auth_user).await?;

    let parent = ParentService::get_parent(&state.db, id, scope, parents).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    get,
    path = "/api/parents/{id}/children",
    params(("id" = Uuid, Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Students linked to the parent", body = Vec<Student>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn get_parent_children(
    State(state): State<AppState>,
    RequireParentsRead(auth_user): RequireParentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Student>>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let parents = ParentScope::for_user(&state.db, &auth_user).await?;

    let children = ParentService::get_children(&state.db, id, scope, parents).await?;
    Ok(Json(children))
}

#[utoipa::path(
    patch,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    request_body = UpdateParentDto,
    responses(
        (status = 200, description = "Parent updated", body = Parent),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn update_parent(
    State(state): State<AppState>,
    RequireParentsUpdate(auth_user): RequireParentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateParentDto>,
) -> Result<Json<Parent>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let parent =
        ParentService::update_parent(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    delete,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    responses(
        (status = 204, description = "Parent deleted, children unlinked"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn delete_parent(
    State(state): State<AppState>,
    RequireParentsDelete(auth_user): RequireParentsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    ParentService::delete_parent(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
