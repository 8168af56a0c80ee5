use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireStudentsCreate, RequireStudentsDelete, RequireStudentsRead, RequireStudentsUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{StudentScope, own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::StudentService;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student account and profile created", body = Student),
        (status = 400, description = "Duplicate email or admission number, or class/parent of another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    State(state): State<AppState>,
    RequireStudentsCreate(auth_user): RequireStudentsCreate,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let student =
        StudentService::create_student(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Students only ever see themselves and parents their own children.
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentFilterParams),
    responses(
        (status = 200, description = "Paginated list of students", body = PaginatedStudentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn get_students(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    filters: Result<Query<StudentFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let page = StudentService::list_students(&state.db, scope, &students, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    State(state): State<AppState>,
    RequireStudentsRead(auth_user): RequireStudentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let student = StudentService::get_student(&state.db, id, scope, &students).await?;
    Ok(Json(student))
}

#[utoipa::path(
    patch,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Duplicate admission number, or class/parent of another school"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    State(state): State<AppState>,
    RequireStudentsUpdate(auth_user): RequireStudentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let student =
        StudentService::update_student(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student and their account deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    State(state): State<AppState>,
    RequireStudentsDelete(auth_user): RequireStudentsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    StudentService::delete_student(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}
