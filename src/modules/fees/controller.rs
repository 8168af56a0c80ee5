use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::fees::{
    CreateFeeDto, Fee, FeeDetails, FeeFilterParams, FeeSummary, FeeSummaryParams,
    PaginatedFeesResponse, PaymentReceipt, RecordPaymentDto, UpdateFeeDto,
};
use uuid::Uuid;

use crate::middleware::auth::{
    RequireFeesCollect, RequireFeesCreate, RequireFeesDelete, RequireFeesRead, RequireFeesUpdate,
};
use crate::state::AppState;
use crate::utils::auth_helpers::{StudentScope, own_school_id, read_scope};
use crate::validator::ValidatedJson;

use super::service::FeeService;

#[utoipa::path(
    post,
    path = "/api/fees",
    request_body = CreateFeeDto,
    responses(
        (status = 201, description = "Fee billed to the student", body = Fee),
        (status = 400, description = "Student belongs to another school"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn create_fee(
    State(state): State<AppState>,
    RequireFeesCreate(auth_user): RequireFeesCreate,
    ValidatedJson(dto): ValidatedJson<CreateFeeDto>,
) -> Result<(StatusCode, Json<Fee>), AppError> {
    let school_id = own_school_id(&auth_user)?;
    let fee = FeeService::create_fee(&state.db, auth_user.user_id()?, school_id, dto).await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

#[utoipa::path(
    get,
    path = "/api/fees",
    params(FeeFilterParams),
    responses(
        (status = 200, description = "Paginated list of fees", body = PaginatedFeesResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn get_fees(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    filters: Result<Query<FeeFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedFeesResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, filters.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let page = FeeService::list_fees(&state.db, scope, &students, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/fees/summary",
    params(FeeSummaryParams),
    responses(
        (status = 200, description = "Fee totals for the school", body = FeeSummary),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn get_fee_summary(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    params: Result<Query<FeeSummaryParams>, QueryRejection>,
) -> Result<Json<FeeSummary>, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let scope = read_scope(&auth_user, params.school_id)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let summary = FeeService::summary(&state.db, scope, &students, params).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/fees/{id}",
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee with its payment history", body = FeeDetails),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn get_fee(
    State(state): State<AppState>,
    RequireFeesRead(auth_user): RequireFeesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<FeeDetails>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let students = StudentScope::for_user(&state.db, &auth_user).await?;

    let details = FeeService::get_fee_details(&state.db, id, scope, &students).await?;
    Ok(Json(details))
}

#[utoipa::path(
    patch,
    path = "/api/fees/{id}",
    params(("id" = Uuid, Path, description = "Fee ID")),
    request_body = UpdateFeeDto,
    responses(
        (status = 200, description = "Fee updated", body = Fee),
        (status = 400, description = "Amount below what was already paid"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn update_fee(
    State(state): State<AppState>,
    RequireFeesUpdate(auth_user): RequireFeesUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateFeeDto>,
) -> Result<Json<Fee>, AppError> {
    let scope = read_scope(&auth_user, None)?;
    let fee = FeeService::update_fee(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok(Json(fee))
}

#[utoipa::path(
    delete,
    path = "/api/fees/{id}",
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 204, description = "Fee and its payments deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Fee not found")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn delete_fee(
    State(state): State<AppState>,
    RequireFeesDelete(auth_user): RequireFeesDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = read_scope(&auth_user, None)?;
    FeeService::delete_fee(&state.db, auth_user.user_id()?, id, scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/fees/{id}/payments",
    params(("id" = Uuid, Path, description = "Fee ID")),
    request_body = RecordPaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentReceipt),
        (status = 400, description = "Payment exceeds the outstanding balance"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Fee not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Fees",
    security(("bearer_auth" = []))
)]
pub async fn record_payment(
    State(state): State<AppState>,
    RequireFeesCollect(auth_user): RequireFeesCollect,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RecordPaymentDto>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError> {
    let scope = read_scope(&auth_user, None)?;
    let receipt =
        FeeService::record_payment(&state.db, auth_user.user_id()?, id, scope, dto).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
