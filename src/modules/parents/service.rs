use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta, UserRole};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::parents::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentFilterParams, UpdateParentDto,
};
use scholaris_models::students::Student;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::audit_logs::AuditService;
use crate::modules::students::StudentService;
use crate::modules::users::{NewAccount, UserService};
use crate::utils::auth_helpers::{ensure_in_scope, push_school_scope};
use crate::utils::db::like_pattern;

const PARENT_SELECT: &str = r#"SELECT p.id, p.user_id, p.school_id, u.first_name, u.last_name,
       u.email, u.is_active, p.phone, p.occupation, p.address,
       (SELECT COUNT(*) FROM students s WHERE s.parent_id = p.id) AS children_count,
       p.created_at, p.updated_at
FROM parents p
JOIN users u ON u.id = p.user_id"#;

/// Parent accounts may only look at their own profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    Any,
    OnlySelf(Option<Uuid>),
}

impl ParentScope {
    pub async fn for_user(db: &PgPool, auth_user: &AuthUser) -> Result<Self, AppError> {
        if auth_user.role() != UserRole::Parent {
            return Ok(ParentScope::Any);
        }
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM parents WHERE user_id = $1")
            .bind(auth_user.user_id()?)
            .fetch_optional(db)
            .await?;
        Ok(ParentScope::OnlySelf(id))
    }

    fn allows(&self, parent_id: Uuid) -> bool {
        match self {
            ParentScope::Any => true,
            ParentScope::OnlySelf(own) => *own == Some(parent_id),
        }
    }
}

pub struct ParentService;

impl ParentService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "parents"))]
    pub async fn create_parent(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateParentDto,
    ) -> Result<Parent, AppError> {
        let mut tx = db.begin().await?;

        let user = UserService::insert_account(
            &mut *tx,
            NewAccount {
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                email: &dto.email,
                password: &dto.password,
                role: UserRole::Parent,
                school_id: Some(school_id),
            },
        )
        .await?;

        let parent_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO parents (user_id, school_id, phone, occupation, address)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(user.id)
        .bind(school_id)
        .bind(&dto.phone)
        .bind(&dto.occupation)
        .bind(&dto.address)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "parent", Some(parent_id))
                .details(json!({ "email": user.email })),
        )
        .await?;

        let parent = sqlx::query_as::<_, Parent>(&format!("{} WHERE p.id = $1", PARENT_SELECT))
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(parent)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        parents: ParentScope,
        filters: &ParentFilterParams,
    ) {
        push_school_scope(qb, "p.school_id", scope);

        if let ParentScope::OnlySelf(own) = parents {
            // A parent account without a profile row matches nothing.
            qb.push(" AND p.id = ");
            qb.push_bind(own.unwrap_or_else(Uuid::nil));
        }
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (u.first_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.last_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.email ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.phone ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "parents"))]
    pub async fn list_parents(
        db: &PgPool,
        scope: Option<Uuid>,
        parents: ParentScope,
        filters: ParentFilterParams,
    ) -> Result<PaginatedParentsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM parents p JOIN users u ON u.id = p.user_id WHERE TRUE",
        );
        Self::push_filters(&mut count, scope, parents, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", PARENT_SELECT));
        Self::push_filters(&mut query, scope, parents, &filters);
        query.push(" ORDER BY u.last_name, u.first_name, p.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Parent>().fetch_all(db).await?;

        Ok(PaginatedParentsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "parents"))]
    pub async fn get_parent(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        parents: ParentScope,
    ) -> Result<Parent, AppError> {
        if !parents.allows(id) {
            return Err(AppError::not_found(anyhow!("Parent not found")));
        }

        let parent = sqlx::query_as::<_, Parent>(&format!("{} WHERE p.id = $1", PARENT_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Parent not found")))?;

        ensure_in_scope(scope, parent.school_id, "Parent")?;
        Ok(parent)
    }

    pub async fn get_children(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        parents: ParentScope,
    ) -> Result<Vec<Student>, AppError> {
        let parent = Self::get_parent(db, id, scope, parents).await?;
        StudentService::children_of_parent(db, parent.id).await
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "parents"))]
    pub async fn update_parent(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateParentDto,
    ) -> Result<Parent, AppError> {
        let existing = Self::get_parent(db, id, scope, ParentScope::Any).await?;

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   is_active = COALESCE($4, is_active),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(existing.user_id)
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.is_active)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE parents
               SET phone = COALESCE($2, phone),
                   occupation = COALESCE($3, occupation),
                   address = COALESCE($4, address),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&dto.phone)
        .bind(&dto.occupation)
        .bind(&dto.address)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "parent", Some(id))
                .details(json!({ "is_active": dto.is_active })),
        )
        .await?;

        let parent = sqlx::query_as::<_, Parent>(&format!("{} WHERE p.id = $1", PARENT_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(parent)
    }

    /// Deleting a parent unlinks their children rather than removing them.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "parents"))]
    pub async fn delete_parent(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_parent(db, id, scope, ParentScope::Any).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(existing.user_id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "parent", Some(id))
                .details(json!({ "email": existing.email })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
