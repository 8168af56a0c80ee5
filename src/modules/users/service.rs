use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta, UserRole, hash_password};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::users::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams,
};
use scholaris_observability::track_user_created;
use serde_json::json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{ensure_in_scope, push_school_scope};
use crate::utils::db::{like_pattern, unique_violation};

pub(crate) const USER_COLUMNS: &str = "id, first_name, last_name, email, role, school_id, is_active, last_login_at, created_at, updated_at";

/// Login account written alongside a profile row or on its own.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: UserRole,
    pub school_id: Option<Uuid>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService;

impl UserService {
    /// Hashes the password and inserts the account. Duplicate emails are a 400.
    pub async fn insert_account<'e, E>(executor: E, account: NewAccount<'_>) -> Result<User, AppError>
    where
        E: PgExecutor<'e>,
    {
        let hashed = hash_password(account.password)?;
        let email = normalize_email(account.email);

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, password, role, school_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(account.first_name.trim())
        .bind(account.last_name.trim())
        .bind(&email)
        .bind(hashed)
        .bind(account.role)
        .bind(account.school_id)
        .fetch_one(executor)
        .await
        .map_err(|e| unique_violation(e, format!("User with email {} already exists", email)))?;

        track_user_created(account.role.as_str());
        Ok(user)
    }

    /// Creates an administrator account.
    ///
    /// Super admins create super admins or school admins for any existing
    /// school. School admins create school admins in their own school only.
    /// Teachers, students and parents go through their own endpoints because
    /// they need a profile row.
    #[instrument(skip(db, creator, dto), fields(db.operation = "INSERT", db.table = "users"))]
    pub async fn create_user(
        db: &PgPool,
        creator: &AuthUser,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        let school_id = match dto.role {
            UserRole::SuperAdmin => {
                if !creator.is_super_admin() {
                    return Err(AppError::forbidden(
                        "Only super admins can create super admin accounts".to_string(),
                    ));
                }
                None
            }
            UserRole::SchoolAdmin => {
                let school_id = if creator.is_super_admin() {
                    dto.school_id.ok_or_else(|| {
                        AppError::bad_request(anyhow!("school_id is required for school admins"))
                    })?
                } else {
                    let own = creator.school_id().ok_or_else(|| {
                        AppError::forbidden("User must be associated with a school".to_string())
                    })?;
                    if dto.school_id.is_some_and(|requested| requested != own) {
                        return Err(AppError::forbidden(
                            "You can only create users in your own school".to_string(),
                        ));
                    }
                    own
                };
                Some(school_id)
            }
            role => {
                return Err(AppError::bad_request(anyhow!(
                    "Accounts with role {} are created through /api/{}s",
                    role,
                    role
                )));
            }
        };

        if let Some(school_id) = school_id {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM schools WHERE id = $1)")
                .bind(school_id)
                .fetch_one(db)
                .await?;
            if !exists {
                return Err(AppError::bad_request(anyhow!("School not found")));
            }
        }

        let mut tx = db.begin().await?;

        let user = Self::insert_account(
            &mut *tx,
            NewAccount {
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                email: &dto.email,
                password: &dto.password,
                role: dto.role,
                school_id,
            },
        )
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(creator.user_id()?, school_id, AuditAction::Create, "user", Some(user.id))
                .details(json!({ "email": user.email, "role": user.role })),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        filters: &UserFilterParams,
    ) {
        push_school_scope(qb, "school_id", scope);
        if let Some(role) = filters.role {
            qb.push(" AND role = ");
            qb.push_bind(role);
        }
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (first_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR last_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR email ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn list_users(
        db: &PgPool,
        scope: Option<Uuid>,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        Self::push_filters(&mut count, scope, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        Self::push_filters(&mut query, scope, &filters);
        query.push(" ORDER BY last_name, first_name, id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<User>().fetch_all(db).await?;

        Ok(PaginatedUsersResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user(db: &PgPool, id: Uuid, scope: Option<Uuid>) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if scope.is_some() {
            match user.school_id {
                Some(school_id) => ensure_in_scope(scope, school_id, "User")?,
                None => return Err(AppError::not_found(anyhow!("User not found"))),
            }
        }

        Ok(user)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_user(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let existing = Self::get_user(db, id, scope).await?;

        if existing.id == actor_id && dto.is_active == Some(false) {
            return Err(AppError::bad_request(anyhow!("You cannot deactivate your own account")));
        }

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 is_active = COALESCE($4, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.is_active)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, user.school_id, AuditAction::Update, "user", Some(user.id))
                .details(json!({ "is_active": user.is_active })),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Deletes the account. Teacher, student and parent profiles go with it.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "users"))]
    pub async fn delete_user(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        if id == actor_id {
            return Err(AppError::bad_request(anyhow!("You cannot delete your own account")));
        }

        let existing = Self::get_user(db, id, scope).await?;

        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, existing.school_id, AuditAction::Delete, "user", Some(id))
                .details(json!({ "email": existing.email, "role": existing.role })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada.Obi@School.TEST "), "ada.obi@school.test");
    }
}
