//! Direct messages between users.

use scholaris_core::serde::deserialize_optional_trimmed;
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub school_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendMessageDto {
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageFolder {
    #[default]
    Inbox,
    Sent,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageFilterParams {
    /// `inbox` (default) or `sent`
    pub folder: Option<MessageFolder>,
    /// Matches subject or body
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedMessagesResponse {
    pub data: Vec<Message>,
    pub meta: PaginationMeta,
    /// Unread messages in the inbox, regardless of the folder listed
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_defaults_to_inbox() {
        let params: MessageFilterParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.folder.unwrap_or_default(), MessageFolder::Inbox);

        let params: MessageFilterParams = serde_json::from_str(r#"{"folder": "sent"}"#).unwrap();
        assert_eq!(params.folder, Some(MessageFolder::Sent));
    }

    #[test]
    fn test_send_message_validation() {
        let dto = SendMessageDto {
            recipient_id: Uuid::new_v4(),
            subject: String::new(),
            body: "hello".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
