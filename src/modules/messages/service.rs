use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::messages::{
    Message, MessageFilterParams, MessageFolder, PaginatedMessagesResponse, SendMessageDto,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::audit_logs::AuditService;
use crate::utils::db::like_pattern;

const MESSAGE_SELECT: &str = r#"SELECT m.id, m.school_id, m.sender_id,
       CONCAT(su.first_name, ' ', su.last_name) AS sender_name,
       m.recipient_id, CONCAT(ru.first_name, ' ', ru.last_name) AS recipient_name,
       m.subject, m.body, m.read_at, m.created_at
FROM messages m
JOIN users su ON su.id = m.sender_id
JOIN users ru ON ru.id = m.recipient_id"#;

/// Who may message whom. Super admins reach anyone; everyone else stays
/// inside their own school.
fn check_recipient(
    sender: &AuthUser,
    sender_id: Uuid,
    recipient_id: Uuid,
    recipient_school: Option<Uuid>,
) -> Result<(), AppError> {
    if sender_id == recipient_id {
        return Err(AppError::bad_request(anyhow!("You cannot send a message to yourself")));
    }
    if !sender.is_super_admin() && recipient_school != sender.school_id() {
        return Err(AppError::bad_request(anyhow!("Recipient must belong to your school")));
    }
    Ok(())
}

fn push_folder(qb: &mut QueryBuilder<'_, Postgres>, folder: MessageFolder, user_id: Uuid) {
    match folder {
        MessageFolder::Inbox => {
            qb.push(" AND m.recipient_id = ");
            qb.push_bind(user_id);
            qb.push(" AND NOT m.deleted_by_recipient");
        }
        MessageFolder::Sent => {
            qb.push(" AND m.sender_id = ");
            qb.push_bind(user_id);
            qb.push(" AND NOT m.deleted_by_sender");
        }
    }
}

pub struct MessageService;

impl MessageService {
    #[instrument(skip(db, sender, dto), fields(db.operation = "INSERT", db.table = "messages"))]
    pub async fn send_message(
        db: &PgPool,
        sender: &AuthUser,
        dto: SendMessageDto,
    ) -> Result<Message, AppError> {
        let sender_id = sender.user_id()?;

        let recipient_school = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT school_id FROM users WHERE id = $1",
        )
        .bind(dto.recipient_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Recipient not found")))?;

        check_recipient(sender, sender_id, dto.recipient_id, recipient_school)?;

        let school_id = sender.school_id().or(recipient_school);

        let mut tx = db.begin().await?;

        let message_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO messages (school_id, sender_id, recipient_id, subject, body)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(school_id)
        .bind(sender_id)
        .bind(dto.recipient_id)
        .bind(dto.subject.trim())
        .bind(&dto.body)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(sender_id, school_id, AuditAction::Create, "message", Some(message_id))
                .details(json!({ "recipient_id": dto.recipient_id })),
        )
        .await?;

        let message = sqlx::query_as::<_, Message>(&format!("{} WHERE m.id = $1", MESSAGE_SELECT))
            .bind(message_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        user_id: Uuid,
        folder: MessageFolder,
        filters: &MessageFilterParams,
    ) {
        push_folder(qb, folder, user_id);

        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (m.subject ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR m.body ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "messages"))]
    pub async fn list_messages(
        db: &PgPool,
        user_id: Uuid,
        filters: MessageFilterParams,
    ) -> Result<PaginatedMessagesResponse, AppError> {
        let folder = filters.folder.unwrap_or_default();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM messages m WHERE TRUE");
        Self::push_filters(&mut count, user_id, folder, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", MESSAGE_SELECT));
        Self::push_filters(&mut query, user_id, folder, &filters);
        query.push(" ORDER BY m.created_at DESC, m.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Message>().fetch_all(db).await?;
        let unread_count = Self::unread_count(db, user_id).await?;

        Ok(PaginatedMessagesResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
            unread_count,
        })
    }

    pub async fn unread_count(db: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM messages
               WHERE recipient_id = $1 AND read_at IS NULL AND NOT deleted_by_recipient"#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Visible to its sender and recipient until they delete their copy.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "messages"))]
    pub async fn get_message(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<Message, AppError> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"{} WHERE m.id = $1
                 AND ((m.sender_id = $2 AND NOT m.deleted_by_sender)
                   OR (m.recipient_id = $2 AND NOT m.deleted_by_recipient))"#,
            MESSAGE_SELECT
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Message not found")))?;

        Ok(message)
    }

    #[instrument(skip(db), fields(db.operation = "UPDATE", db.table = "messages"))]
    pub async fn mark_read(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<Message, AppError> {
        let message = Self::get_message(db, id, user_id).await?;
        if message.recipient_id != user_id {
            return Err(AppError::forbidden(
                "Only the recipient can mark a message as read".to_string(),
            ));
        }

        sqlx::query("UPDATE messages SET read_at = COALESCE(read_at, NOW()) WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Self::get_message(db, id, user_id).await
    }

    /// Hides the message for the caller. The row goes once both sides
    /// have deleted it.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "messages"))]
    pub async fn delete_message(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let message = Self::get_message(db, id, user_id).await?;

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE messages
               SET deleted_by_sender = deleted_by_sender OR sender_id = $2,
                   deleted_by_recipient = deleted_by_recipient OR recipient_id = $2
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM messages WHERE id = $1 AND deleted_by_sender AND deleted_by_recipient")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(user_id, message.school_id, AuditAction::Delete, "message", Some(id)),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use scholaris_auth::Claims;
    use scholaris_core::UserRole;

    fn sender(role: UserRole, school_id: Option<Uuid>) -> (AuthUser, Uuid) {
        let id = Uuid::new_v4();
        let user = AuthUser(Claims {
            sub: id.to_string(),
            email: "sender@school.test".to_string(),
            role,
            school_id,
            permissions: vec![],
            exp: 9999999999,
            iat: 1234567890,
        });
        (user, id)
    }

    #[test]
    fn test_recipient_must_share_school() {
        let school = Uuid::new_v4();
        let (teacher, id) = sender(UserRole::Teacher, Some(school));

        assert!(check_recipient(&teacher, id, Uuid::new_v4(), Some(school)).is_ok());

        let err = check_recipient(&teacher, id, Uuid::new_v4(), Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = check_recipient(&teacher, id, Uuid::new_v4(), None).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_super_admin_messages_anyone() {
        let (admin, id) = sender(UserRole::SuperAdmin, None);
        assert!(check_recipient(&admin, id, Uuid::new_v4(), Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn test_cannot_message_self() {
        let (parent, id) = sender(UserRole::Parent, Some(Uuid::new_v4()));
        assert!(check_recipient(&parent, id, id, parent.school_id()).is_err());
    }

    #[test]
    fn test_folder_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM messages m WHERE TRUE");
        push_folder(&mut qb, MessageFolder::Sent, Uuid::new_v4());
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM messages m WHERE TRUE AND m.sender_id = $1 AND NOT m.deleted_by_sender"
        );
    }
}
