use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use scholaris_core::AppError;
use scholaris_models::messages::{
    Message, MessageFilterParams, PaginatedMessagesResponse, SendMessageDto,
};
use uuid::Uuid;

use crate::middleware::auth::{RequireMessagesRead, RequireMessagesSend};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::MessageService;

#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = SendMessageDto,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Recipient outside the sender's school"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipient not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    RequireMessagesSend(auth_user): RequireMessagesSend,
    ValidatedJson(dto): ValidatedJson<SendMessageDto>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = MessageService::send_message(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/messages",
    params(MessageFilterParams),
    responses(
        (status = 200, description = "Inbox or sent folder", body = PaginatedMessagesResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
pub async fn get_messages(
    State(state): State<AppState>,
    RequireMessagesRead(auth_user): RequireMessagesRead,
    filters: Result<Query<MessageFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;
    let page = MessageService::list_messages(&state.db, auth_user.user_id()?, filters).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message", body = Message),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
pub async fn get_message(
    State(state): State<AppState>,
    RequireMessagesRead(auth_user): RequireMessagesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    let message = MessageService::get_message(&state.db, id, auth_user.user_id()?).await?;
    Ok(Json(message))
}

#[utoipa::path(
    patch,
    path = "/api/messages/{id}/read",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked as read", body = Message),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the recipient can mark a message read"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
pub async fn mark_message_read(
    State(state): State<AppState>,
    RequireMessagesRead(auth_user): RequireMessagesRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    let message = MessageService::mark_read(&state.db, id, auth_user.user_id()?).await?;
    Ok(Json(message))
}

#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 204, description = "Message removed from the caller's folders"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    RequireMessagesRead(auth_user): RequireMessagesRead,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    MessageService::delete_message(&state.db, id, auth_user.user_id()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
