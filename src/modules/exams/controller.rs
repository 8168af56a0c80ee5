use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::exams::{
    CreateExamDto, Exam, ExamFilterParams, ExamResult, PaginatedExamsResponse,
    PaginatedResultsResponse, RecordResultsDto, RecordResultsResponse, ResultFilterParams,
    UpdateExamDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireExamsCreate, RequireExamsDelete, RequireExamsRead, RequireExamsUpdate,
    RequireResultsRead, RequireResultsWrite,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{StudentScope, own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::ExamService;

#[utoipa::path(
    post,
    path = "/api/exams",
    request_body = CreateExamDto,
    responses(
        (status = 201, description = "Exam scheduled", body = Exam),
        (status = 400, description = "Class belongs to another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn create_exam(
    State(state): State<AppState>,
    RequireExamsCreate(auth_user): RequireExamsCreate,
    ValidatedJson(dto): ValidatedJson<CreateExamDto>,
) -> Result<(StatusCode, Json<Exam>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let exam = ExamService::create_exam(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

#[utoipa::path(
    get,
    path = "/api/exams",
    params(ExamFilterParams),
    responses(
        (status = 200, description = "Paginated list of exams", body = PaginatedExamsResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn get_exams(
    State(state): State<AppState>,
    RequireExamsRead(auth_user): RequireExamsRead,
    filters: Result<Query<ExamFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedExamsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let class_ids = StudentScope::for_user(&state.db, &auth_user)
        .await?
        .class_ids(&state.db)
        .await?;

    let page = ExamService::list_exams(&state.db, scope, &class_ids, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/exams/{id}",
    params(("id" = Uuid, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Exam details", body = Exam),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Exam not found")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn get_exam(
    State(state): State<AppState>,
    RequireExamsRead(auth_user): RequireExamsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Exam>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let class_ids = StudentScope::for_user(&state.db, &auth_user)
        .await?
        .class_ids(&state.db)
        .await?;

    let exam = ExamService::get_exam(&state.db, id, scope, &class_ids).await?;
    Ok(Json(exam))
}

#[utoipa::path(
    patch,
    path = "/api/exams/{id}",
    params(("id" = Uuid, Path, description = "Exam ID")),
    request_body = UpdateExamDto,
    responses(
        (status = 200, description = "Exam updated, recorded results regraded", body = Exam),
        (status = 400, description = "max_marks below marks already recorded"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Exam not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn update_exam(
    State(state): State<AppState>,
    RequireExamsUpdate(auth_user): RequireExamsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateExamDto>,
) -> Result<Json<Exam>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let exam = ExamService::update_exam(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(exam))
}

#[utoipa::path(
    delete,
    path = "/api/exams/{id}",
    params(("id" = Uuid, Path, description = "Exam ID")),
    responses(
        (status = 204, description = "Exam and its results deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Exam not found")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn delete_exam(
    State(state): State<AppState>,
    RequireExamsDelete(auth_user): RequireExamsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    ExamService::delete_exam(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/results",
    params(("id" = Uuid, Path, description = "Exam ID")),
    request_body = RecordResultsDto,
    responses(
        (status = 200, description = "Results recorded", body = RecordResultsResponse),
        (status = 400, description = "Marks above max_marks, duplicate or unenrolled student"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Exam not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn record_results(
    State(state): State<AppState>,
    RequireResultsWrite(auth_user): RequireResultsWrite,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RecordResultsDto>,
) -> Result<Json<RecordResultsResponse>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let response =
        ExamService::record_results(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/exams/{id}/results",
    params(("id" = Uuid, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Results of the exam, best first", body = Vec<ExamResult>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Exam not found")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn get_exam_results(
    State(state): State<AppState>,
    RequireResultsRead(auth_user): RequireResultsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ExamResult>>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let results = ExamService::exam_results(&state.db, id, scope, &students).await?;
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/api/results",
    params(ResultFilterParams),
    responses(
        (status = 200, description = "Paginated list of results", body = PaginatedResultsResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Exams",
    security(("bearer_auth" = []))
)]
pub async fn get_results(
    State(state): State<AppState>,
    RequireResultsRead(auth_user): RequireResultsRead,
    filters: Result<Query<ResultFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedResultsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let page = ExamService::list_results(&state.db, scope, &students, filters).await?;
    Ok(Json(page))
}
