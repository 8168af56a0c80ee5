use scholaris_core::{AppError, UserRole};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;

/// School of a school-scoped caller. Super admins have none and are refused,
/// which is what write paths into a single school want.
pub fn own_school_id(auth_user: &AuthUser) -> Result<Uuid, AppError> {
    auth_user.school_id().ok_or_else(|| {
        AppError::forbidden("This operation requires a school-scoped account".to_string())
    })
}

/// School filter for reads: super admins see every school unless they ask for
/// one, everyone else is pinned to their own school whatever they ask for.
pub fn read_scope(auth_user: &AuthUser, requested: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
    if auth_user.is_super_admin() {
        return Ok(requested);
    }
    own_school_id(auth_user).map(Some)
}

/// Rows outside the caller's scope are reported as missing.
pub fn ensure_in_scope(
    scope: Option<Uuid>,
    resource_school_id: Uuid,
    what: &str,
) -> Result<(), AppError> {
    match scope {
        Some(school_id) if school_id != resource_school_id => {
            Err(AppError::not_found(anyhow::anyhow!("{} not found", what)))
        }
        _ => Ok(()),
    }
}

/// Appends `AND <column> = $n` when a school scope is set.
pub fn push_school_scope(qb: &mut QueryBuilder<'_, Postgres>, column: &str, scope: Option<Uuid>) {
    if let Some(school_id) = scope {
        qb.push(format!(" AND {} = ", column));
        qb.push_bind(school_id);
    }
}

/// Which student records the caller may read.
///
/// Students see only themselves and parents only their linked children;
/// staff are limited by school scope alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentScope {
    Unrestricted,
    Students(Vec<Uuid>),
}

impl StudentScope {
    pub async fn for_user(db: &PgPool, auth_user: &AuthUser) -> Result<Self, AppError> {
        let user_id = auth_user.user_id()?;
        match auth_user.role() {
            UserRole::Student => {
                let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_all(db)
                    .await?;
                Ok(StudentScope::Students(ids))
            }
            UserRole::Parent => {
                let ids = sqlx::query_scalar::<_, Uuid>(
                    r#"SELECT s.id
                       FROM students s
                       JOIN parents p ON p.id = s.parent_id
                       WHERE p.user_id = $1"#,
                )
                .bind(user_id)
                .fetch_all(db)
                .await?;
                Ok(StudentScope::Students(ids))
            }
            _ => Ok(StudentScope::Unrestricted),
        }
    }

    pub fn allows(&self, student_id: Uuid) -> bool {
        match self {
            StudentScope::Unrestricted => true,
            StudentScope::Students(ids) => ids.contains(&student_id),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, StudentScope::Students(_))
    }

    pub fn student_ids(&self) -> Option<&[Uuid]> {
        match self {
            StudentScope::Unrestricted => None,
            StudentScope::Students(ids) => Some(ids),
        }
    }

    /// Appends `AND <column> = ANY($n)` for restricted callers.
    pub fn push_filter(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        if let StudentScope::Students(ids) = self {
            qb.push(format!(" AND {} = ANY(", column));
            qb.push_bind(ids.clone());
            qb.push(")");
        }
    }

    /// Classes the scoped students are enrolled in; `None` when unrestricted.
    pub async fn class_ids(&self, db: &PgPool) -> Result<Option<Vec<Uuid>>, AppError> {
        let StudentScope::Students(ids) = self else {
            return Ok(None);
        };
        let class_ids = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT DISTINCT class_id FROM students
               WHERE id = ANY($1) AND class_id IS NOT NULL"#,
        )
        .bind(ids.as_slice())
        .fetch_all(db)
        .await?;
        Ok(Some(class_ids))
    }

    /// 404 for students outside the scope.
    pub fn ensure_allows(&self, student_id: Uuid, what: &str) -> Result<(), AppError> {
        if self.allows(student_id) {
            Ok(())
        } else {
            Err(AppError::not_found(anyhow::anyhow!("{} not found", what)))
        }
    }
}

/// Profile row id of a teacher account.
pub async fn teacher_id_for_user(db: &PgPool, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM teachers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(id)
}

/// Checks that `class_id` belongs to `school_id`. A class of another school
/// or a missing one is a bad reference in the request body.
pub async fn ensure_class_in_school(
    db: &PgPool,
    class_id: Uuid,
    school_id: Uuid,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1 AND school_id = $2)",
    )
    .bind(class_id)
    .bind(school_id)
    .fetch_one(db)
    .await?;

    if !exists {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Class does not belong to this school"
        )));
    }
    Ok(())
}

pub async fn ensure_student_in_school(
    db: &PgPool,
    student_id: Uuid,
    school_id: Uuid,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1 AND school_id = $2)",
    )
    .bind(student_id)
    .bind(school_id)
    .fetch_one(db)
    .await?;

    if !exists {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Student does not belong to this school"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use scholaris_auth::Claims;

    fn auth_user(role: UserRole, school_id: Option<Uuid>) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role,
            school_id,
            permissions: vec![],
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_read_scope_super_admin_uses_requested_school() {
        let admin = auth_user(UserRole::SuperAdmin, None);
        assert_eq!(read_scope(&admin, None).unwrap(), None);

        let requested = Uuid::new_v4();
        assert_eq!(read_scope(&admin, Some(requested)).unwrap(), Some(requested));
    }

    #[test]
    fn test_read_scope_pins_school_users() {
        let own = Uuid::new_v4();
        let teacher = auth_user(UserRole::Teacher, Some(own));
        assert_eq!(read_scope(&teacher, Some(Uuid::new_v4())).unwrap(), Some(own));
    }

    #[test]
    fn test_own_school_id_refuses_super_admin() {
        let admin = auth_user(UserRole::SuperAdmin, None);
        assert_eq!(own_school_id(&admin).unwrap_err().status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_ensure_in_scope_hides_other_tenants() {
        let school = Uuid::new_v4();
        assert!(ensure_in_scope(None, school, "Class").is_ok());
        assert!(ensure_in_scope(Some(school), school, "Class").is_ok());

        let err = ensure_in_scope(Some(Uuid::new_v4()), school, "Class").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.error.to_string(), "Class not found");
    }

    #[test]
    fn test_student_scope_allows() {
        let child = Uuid::new_v4();
        let scope = StudentScope::Students(vec![child]);
        assert!(scope.allows(child));
        assert!(!scope.allows(Uuid::new_v4()));
        assert!(scope.is_restricted());
        assert!(StudentScope::Unrestricted.allows(Uuid::new_v4()));
        assert_eq!(StudentScope::Unrestricted.student_ids(), None);
    }

    #[test]
    fn test_student_scope_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM fees f WHERE TRUE");
        StudentScope::Students(vec![Uuid::new_v4()]).push_filter(&mut qb, "f.student_id");
        push_school_scope(&mut qb, "f.school_id", Some(Uuid::new_v4()));
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM fees f WHERE TRUE AND f.student_id = ANY($1) AND f.school_id = $2"
        );
    }
}
