use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use scholaris_auth::{Claims, verify_token};
use scholaris_core::permissions as perm;
use scholaris_core::{AppError, UserRole};
use uuid::Uuid;

use crate::state::AppState;

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.has_permission(permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn is_super_admin(&self) -> bool {
        self.0.role == UserRole::SuperAdmin
    }

    /// `None` for super admins.
    pub fn school_id(&self) -> Option<Uuid> {
        self.0.school_id
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0
            .user_id()
            .ok_or_else(|| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that authenticates the caller and then requires one
/// permission, rejecting with 403 when it is missing.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = scholaris_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user = <$crate::middleware::auth::AuthUser as axum::extract::FromRequestParts<
                    $crate::state::AppState,
                >>::from_request_parts(parts, state)
                .await?;

                if !auth_user.has_permission($permission) {
                    return Err(scholaris_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

// Schools
require_permission!(RequireSchoolsCreate, perm::SCHOOLS_CREATE);
require_permission!(RequireSchoolsRead, perm::SCHOOLS_READ);
require_permission!(RequireSchoolsUpdate, perm::SCHOOLS_UPDATE);
require_permission!(RequireSchoolsDelete, perm::SCHOOLS_DELETE);

// Users
require_permission!(RequireUsersCreate, perm::USERS_CREATE);
require_permission!(RequireUsersRead, perm::USERS_READ);
require_permission!(RequireUsersUpdate, perm::USERS_UPDATE);
require_permission!(RequireUsersDelete, perm::USERS_DELETE);

// Classes
require_permission!(RequireClassesCreate, perm::CLASSES_CREATE);
require_permission!(RequireClassesRead, perm::CLASSES_READ);
require_permission!(RequireClassesUpdate, perm::CLASSES_UPDATE);
require_permission!(RequireClassesDelete, perm::CLASSES_DELETE);

// Teachers
require_permission!(RequireTeachersCreate, perm::TEACHERS_CREATE);
require_permission!(RequireTeachersRead, perm::TEACHERS_READ);
require_permission!(RequireTeachersUpdate, perm::TEACHERS_UPDATE);
require_permission!(RequireTeachersDelete, perm::TEACHERS_DELETE);

// Students
require_permission!(RequireStudentsCreate, perm::STUDENTS_CREATE);
require_permission!(RequireStudentsRead, perm::STUDENTS_READ);
require_permission!(RequireStudentsUpdate, perm::STUDENTS_UPDATE);
require_permission!(RequireStudentsDelete, perm::STUDENTS_DELETE);

// Parents
require_permission!(RequireParentsCreate, perm::PARENTS_CREATE);
require_permission!(RequireParentsRead, perm::PARENTS_READ);
require_permission!(RequireParentsUpdate, perm::PARENTS_UPDATE);
require_permission!(RequireParentsDelete, perm::PARENTS_DELETE);

// Notices
require_permission!(RequireNoticesCreate, perm::NOTICES_CREATE);
require_permission!(RequireNoticesRead, perm::NOTICES_READ);
require_permission!(RequireNoticesUpdate, perm::NOTICES_UPDATE);
require_permission!(RequireNoticesDelete, perm::NOTICES_DELETE);

// Exams and results
require_permission!(RequireExamsCreate, perm::EXAMS_CREATE);
require_permission!(RequireExamsRead, perm::EXAMS_READ);
require_permission!(RequireExamsUpdate, perm::EXAMS_UPDATE);
require_permission!(RequireExamsDelete, perm::EXAMS_DELETE);
require_permission!(RequireResultsWrite, perm::RESULTS_WRITE);
require_permission!(RequireResultsRead, perm::RESULTS_READ);

// Fees
require_permission!(RequireFeesCreate, perm::FEES_CREATE);
require_permission!(RequireFeesRead, perm::FEES_READ);
require_permission!(RequireFeesUpdate, perm::FEES_UPDATE);
require_permission!(RequireFeesDelete, perm::FEES_DELETE);
require_permission!(RequireFeesCollect, perm::FEES_COLLECT);

// Attendance
require_permission!(RequireAttendanceMark, perm::ATTENDANCE_MARK);
require_permission!(RequireAttendanceRead, perm::ATTENDANCE_READ);
require_permission!(RequireAttendanceUpdate, perm::ATTENDANCE_UPDATE);
require_permission!(RequireAttendanceDelete, perm::ATTENDANCE_DELETE);

// Messages
require_permission!(RequireMessagesSend, perm::MESSAGES_SEND);
require_permission!(RequireMessagesRead, perm::MESSAGES_READ);

// Audit logs and dashboard
require_permission!(RequireAuditLogsRead, perm::AUDIT_LOGS_READ);
require_permission!(RequireDashboardRead, perm::DASHBOARD_READ);

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user(role: UserRole, school_id: Option<Uuid>) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role,
            school_id,
            permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_has_permission_follows_role() {
        let teacher = auth_user(UserRole::Teacher, Some(Uuid::new_v4()));
        assert!(teacher.has_permission(perm::NOTICES_CREATE));
        assert!(!teacher.has_permission(perm::SCHOOLS_CREATE));
    }

    #[test]
    fn test_has_any_permission() {
        let student = auth_user(UserRole::Student, Some(Uuid::new_v4()));
        assert!(student.has_any_permission(&[perm::NOTICES_CREATE, perm::NOTICES_READ]));
        assert!(!student.has_any_permission(&[perm::NOTICES_CREATE, perm::FEES_CREATE]));
    }

    #[test]
    fn test_super_admin_has_no_school() {
        let admin = auth_user(UserRole::SuperAdmin, None);
        assert!(admin.is_super_admin());
        assert_eq!(admin.school_id(), None);
    }

    #[test]
    fn test_user_id_parses_subject() {
        let user = auth_user(UserRole::Parent, Some(Uuid::new_v4()));
        assert_eq!(user.user_id().unwrap().to_string(), user.0.sub);

        let mut broken = user.clone();
        broken.0.sub = "not-a-uuid".to_string();
        assert!(broken.user_id().is_err());
    }
}
