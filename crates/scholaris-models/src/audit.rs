//! Audit trail models.

use scholaris_core::serde::{deserialize_optional_trimmed, deserialize_optional_uuid};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    PasswordChange,
    Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub school_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub action: AuditAction,
    #[schema(example = "notice")]
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// An entry about to be written.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub school_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        actor_id: Uuid,
        school_id: Option<Uuid>,
        action: AuditAction,
        entity_type: &'static str,
        entity_id: Option<Uuid>,
    ) -> Self {
        Self {
            school_id,
            actor_id,
            action,
            entity_type,
            entity_id,
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub entity_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub entity_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub actor_id: Option<Uuid>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedAuditLogsResponse {
    pub data: Vec<AuditLog>,
    pub meta: PaginationMeta,
}
