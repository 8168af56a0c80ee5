use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta, UserRole};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::notices::{
    CreateNoticeDto, Notice, NoticeAudience, NoticeFilterParams, PaginatedNoticesResponse,
    UpdateNoticeDto,
};
use scholaris_observability::track_notice_published;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{
    StudentScope, ensure_class_in_school, ensure_in_scope, push_school_scope,
};
use crate::utils::db::like_pattern;

const NOTICE_SELECT: &str = r#"SELECT n.id, n.school_id, n.title, n.content, n.audience, n.priority,
       n.class_id, NULLIF(TRIM(CONCAT(c.name, ' ', c.section)), '') AS class_name,
       n.author_id, NULLIF(TRIM(CONCAT(u.first_name, ' ', u.last_name)), '') AS author_name,
       n.expires_at, n.created_at, n.updated_at
FROM notices n
LEFT JOIN classes c ON c.id = n.class_id
LEFT JOIN users u ON u.id = n.author_id"#;

/// What part of a school's notice board a caller may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeVisibility {
    pub audiences: Vec<NoticeAudience>,
    /// `Some` restricts class-targeted notices to these classes; school-wide
    /// notices stay visible.
    pub class_ids: Option<Vec<Uuid>>,
    pub include_expired: bool,
}

impl NoticeVisibility {
    pub fn for_admin(requested: Option<NoticeAudience>) -> Self {
        Self {
            audiences: NoticeAudience::resolve_filter(UserRole::SchoolAdmin, requested),
            class_ids: None,
            include_expired: true,
        }
    }

    pub async fn for_user(
        db: &PgPool,
        auth_user: &AuthUser,
        requested: Option<NoticeAudience>,
    ) -> Result<Self, AppError> {
        let role = auth_user.role();
        if role.is_admin() {
            return Ok(Self::for_admin(requested));
        }

        let class_ids = StudentScope::for_user(db, auth_user)
            .await?
            .class_ids(db)
            .await?;

        Ok(Self {
            audiences: NoticeAudience::resolve_filter(role, requested),
            class_ids,
            include_expired: false,
        })
    }

    fn allows(&self, notice: &Notice, now: chrono::DateTime<chrono::Utc>) -> bool {
        if !self.audiences.contains(&notice.audience) {
            return false;
        }
        if !self.include_expired && notice.is_expired(now) {
            return false;
        }
        match (&self.class_ids, notice.class_id) {
            (Some(ids), Some(class_id)) => ids.contains(&class_id),
            _ => true,
        }
    }

    fn push_filter(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.audiences.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND n.audience IN (");
            let mut separated = qb.separated(", ");
            for audience in &self.audiences {
                separated.push_bind(*audience);
            }
            separated.push_unseparated(")");
        }

        if let Some(ids) = &self.class_ids {
            qb.push(" AND (n.class_id IS NULL OR n.class_id = ANY(");
            qb.push_bind(ids.clone());
            qb.push("))");
        }

        if !self.include_expired {
            qb.push(" AND (n.expires_at IS NULL OR n.expires_at > NOW())");
        }
    }
}

/// Teachers may only change notices they wrote; school admins any notice of
/// their school.
fn ensure_can_modify(auth_user: &AuthUser, notice: &Notice) -> Result<(), AppError> {
    if auth_user.role() == UserRole::Teacher && notice.author_id != Some(auth_user.user_id()?) {
        return Err(AppError::forbidden(
            "You can only modify notices you authored".to_string(),
        ));
    }
    Ok(())
}

pub struct NoticeService;

impl NoticeService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "notices"))]
    pub async fn create_notice(
        db: &PgPool,
        author_id: Uuid,
        school_id: Uuid,
        dto: CreateNoticeDto,
    ) -> Result<Notice, AppError> {
        if let Some(class_id) = dto.class_id {
            ensure_class_in_school(db, class_id, school_id).await?;
        }

        let mut tx = db.begin().await?;

        let notice_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO notices (school_id, title, content, audience, priority, class_id,
                                    author_id, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id"#,
        )
        .bind(school_id)
        .bind(dto.title.trim())
        .bind(&dto.content)
        .bind(dto.audience)
        .bind(dto.priority)
        .bind(dto.class_id)
        .bind(author_id)
        .bind(dto.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(author_id, Some(school_id), AuditAction::Create, "notice", Some(notice_id))
                .details(json!({
                    "title": dto.title,
                    "audience": dto.audience,
                    "class_id": dto.class_id,
                })),
        )
        .await?;

        let notice = sqlx::query_as::<_, Notice>(&format!("{} WHERE n.id = $1", NOTICE_SELECT))
            .bind(notice_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        track_notice_published(notice.audience.as_str());
        Ok(notice)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        visibility: &NoticeVisibility,
        filters: &NoticeFilterParams,
    ) {
        push_school_scope(qb, "n.school_id", scope);
        visibility.push_filter(qb);

        if let Some(priority) = filters.priority {
            qb.push(" AND n.priority = ");
            qb.push_bind(priority);
        }
        if let Some(class_id) = filters.class_id {
            qb.push(" AND n.class_id = ");
            qb.push_bind(class_id);
        }
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (n.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR n.content ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, visibility, filters), fields(db.operation = "SELECT", db.table = "notices"))]
    pub async fn list_notices(
        db: &PgPool,
        scope: Option<Uuid>,
        visibility: &NoticeVisibility,
        filters: NoticeFilterParams,
    ) -> Result<PaginatedNoticesResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notices n WHERE TRUE");
        Self::push_filters(&mut count, scope, visibility, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", NOTICE_SELECT));
        Self::push_filters(&mut query, scope, visibility, &filters);
        query.push(" ORDER BY n.created_at DESC, n.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Notice>().fetch_all(db).await?;

        Ok(PaginatedNoticesResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db, visibility), fields(db.operation = "SELECT", db.table = "notices"))]
    pub async fn get_notice(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        visibility: &NoticeVisibility,
    ) -> Result<Notice, AppError> {
        let notice = sqlx::query_as::<_, Notice>(&format!("{} WHERE n.id = $1", NOTICE_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Notice not found")))?;

        ensure_in_scope(scope, notice.school_id, "Notice")?;
        if !visibility.allows(&notice, chrono::Utc::now()) {
            return Err(AppError::not_found(anyhow!("Notice not found")));
        }
        Ok(notice)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "notices"))]
    pub async fn update_notice(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateNoticeDto,
    ) -> Result<Notice, AppError> {
        let existing = Self::get_notice(db, id, scope, &NoticeVisibility::for_admin(None)).await?;
        ensure_can_modify(auth_user, &existing)?;

        if let Some(Some(class_id)) = dto.class_id {
            ensure_class_in_school(db, class_id, existing.school_id).await?;
        }

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE notices
               SET title = COALESCE($2, title),
                   content = COALESCE($3, content),
                   audience = COALESCE($4, audience),
                   priority = COALESCE($5, priority),
                   class_id = CASE WHEN $6 THEN $7 ELSE class_id END,
                   expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.content)
        .bind(dto.audience)
        .bind(dto.priority)
        .bind(dto.class_id.is_some())
        .bind(dto.class_id.flatten())
        .bind(dto.expires_at.is_some())
        .bind(dto.expires_at.flatten())
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                auth_user.user_id()?,
                Some(existing.school_id),
                AuditAction::Update,
                "notice",
                Some(id),
            )
            .details(json!({ "title": dto.title, "audience": dto.audience })),
        )
        .await?;

        let notice = sqlx::query_as::<_, Notice>(&format!("{} WHERE n.id = $1", NOTICE_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(notice)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "DELETE", db.table = "notices"))]
    pub async fn delete_notice(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_notice(db, id, scope, &NoticeVisibility::for_admin(None)).await?;
        ensure_can_modify(auth_user, &existing)?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                auth_user.user_id()?,
                Some(existing.school_id),
                AuditAction::Delete,
                "notice",
                Some(id),
            )
            .details(json!({ "title": existing.title })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
