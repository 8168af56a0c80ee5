//! Notice board models and audience rules.
//!
//! A notice targets an [`NoticeAudience`] and optionally a single class.
//! Which notices a requester sees depends on their role:
//!
//! | Role                     | Visible audiences      |
//! |--------------------------|------------------------|
//! | super / school admin     | all four               |
//! | teacher                  | `ALL`, `TEACHERS`      |
//! | student                  | `ALL`, `STUDENTS`      |
//! | parent                   | `ALL`, `PARENTS`       |

use scholaris_core::UserRole;
use scholaris_core::serde::{
    deserialize_nullable, deserialize_optional_trimmed, deserialize_optional_uuid,
};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "notice_audience", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NoticeAudience {
    #[default]
    All,
    Students,
    Teachers,
    Parents,
}

impl NoticeAudience {
    pub const EVERY: [NoticeAudience; 4] = [
        NoticeAudience::All,
        NoticeAudience::Students,
        NoticeAudience::Teachers,
        NoticeAudience::Parents,
    ];

    /// Audiences a role may read.
    pub fn visible_to(role: UserRole) -> Vec<NoticeAudience> {
        match role {
            UserRole::SuperAdmin | UserRole::SchoolAdmin => Self::EVERY.to_vec(),
            UserRole::Teacher => vec![NoticeAudience::All, NoticeAudience::Teachers],
            UserRole::Student => vec![NoticeAudience::All, NoticeAudience::Students],
            UserRole::Parent => vec![NoticeAudience::All, NoticeAudience::Parents],
        }
    }

    /// Audiences to query for a listing. An explicit filter is intersected
    /// with what the role may see, so asking for a hidden audience yields an
    /// empty set.
    pub fn resolve_filter(role: UserRole, requested: Option<NoticeAudience>) -> Vec<NoticeAudience> {
        let visible = Self::visible_to(role);
        match requested {
            None => visible,
            Some(audience) if visible.contains(&audience) => vec![audience],
            Some(_) => Vec::new(),
        }
    }

    pub fn is_visible_to(&self, role: UserRole) -> bool {
        Self::visible_to(role).contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeAudience::All => "ALL",
            NoticeAudience::Students => "STUDENTS",
            NoticeAudience::Teachers => "TEACHERS",
            NoticeAudience::Parents => "PARENTS",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "notice_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NoticePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notice {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub content: String,
    pub audience: NoticeAudience,
    pub priority: NoticePriority,
    /// When set, only members of this class (and its students' parents) see it
    pub class_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Notice {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateNoticeDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    #[serde(default)]
    pub audience: NoticeAudience,
    #[serde(default)]
    pub priority: NoticePriority,
    /// Must belong to the requester's school
    pub class_id: Option<Uuid>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateNoticeDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub content: Option<String>,
    pub audience: Option<NoticeAudience>,
    pub priority: Option<NoticePriority>,
    /// `null` makes the notice school-wide
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub class_id: Option<Option<Uuid>>,
    /// `null` removes the expiry
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<chrono::DateTime<chrono::Utc>>, nullable)]
    pub expires_at: Option<Option<chrono::DateTime<chrono::Utc>>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NoticeFilterParams {
    /// Narrow to one audience; defaults to every audience visible to the caller
    pub audience: Option<NoticeAudience>,
    pub priority: Option<NoticePriority>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    /// Matches title or content
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedNoticesResponse {
    pub data: Vec<Notice>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_audiences_per_role() {
        assert_eq!(
            NoticeAudience::visible_to(UserRole::Student),
            vec![NoticeAudience::All, NoticeAudience::Students]
        );
        assert_eq!(
            NoticeAudience::visible_to(UserRole::Teacher),
            vec![NoticeAudience::All, NoticeAudience::Teachers]
        );
        assert_eq!(
            NoticeAudience::visible_to(UserRole::Parent),
            vec![NoticeAudience::All, NoticeAudience::Parents]
        );
        assert_eq!(NoticeAudience::visible_to(UserRole::SchoolAdmin).len(), 4);
        assert_eq!(NoticeAudience::visible_to(UserRole::SuperAdmin).len(), 4);
    }

    #[test]
    fn test_resolve_filter_defaults_to_visible() {
        assert_eq!(
            NoticeAudience::resolve_filter(UserRole::Parent, None),
            vec![NoticeAudience::All, NoticeAudience::Parents]
        );
    }

    #[test]
    fn test_resolve_filter_intersects_explicit_audience() {
        assert_eq!(
            NoticeAudience::resolve_filter(UserRole::Student, Some(NoticeAudience::Students)),
            vec![NoticeAudience::Students]
        );
        assert!(
            NoticeAudience::resolve_filter(UserRole::Student, Some(NoticeAudience::Teachers))
                .is_empty()
        );
        assert_eq!(
            NoticeAudience::resolve_filter(UserRole::SchoolAdmin, Some(NoticeAudience::Teachers)),
            vec![NoticeAudience::Teachers]
        );
    }

    #[test]
    fn test_is_visible_to() {
        assert!(NoticeAudience::All.is_visible_to(UserRole::Parent));
        assert!(!NoticeAudience::Students.is_visible_to(UserRole::Parent));
    }

    #[test]
    fn test_create_dto_defaults() {
        let dto: CreateNoticeDto =
            serde_json::from_str(r#"{"title": "Sports day", "content": "Friday"}"#).unwrap();
        assert_eq!(dto.audience, NoticeAudience::All);
        assert_eq!(dto.priority, NoticePriority::Normal);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_audience_wire_format() {
        let dto: CreateNoticeDto = serde_json::from_str(
            r#"{"title": "PTA", "content": "Meeting", "audience": "PARENTS", "priority": "HIGH"}"#,
        )
        .unwrap();
        assert_eq!(dto.audience, NoticeAudience::Parents);
        assert_eq!(dto.priority, NoticePriority::High);
    }

    #[test]
    fn test_is_expired() {
        let now = chrono::Utc::now();
        let notice = Notice {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            title: "t".to_string(),
            content: "c".to_string(),
            audience: NoticeAudience::All,
            priority: NoticePriority::Normal,
            class_id: None,
            class_name: None,
            author_id: None,
            author_name: None,
            expires_at: Some(now - chrono::Duration::hours(1)),
            created_at: now,
            updated_at: now,
        };
        assert!(notice.is_expired(now));
        let open = Notice {
            expires_at: None,
            ..notice
        };
        assert!(!open.is_expired(now));
    }
}
