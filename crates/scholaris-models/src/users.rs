//! User account models and DTOs.
//!
//! A user is a login. Teachers, students and parents additionally own a
//! profile row (see the [`crate::teachers`], [`crate::students`] and
//! [`crate::parents`] modules) created together with the account.

use scholaris_core::UserRole;
use scholaris_core::serde::{deserialize_optional_trimmed, deserialize_optional_uuid};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// A user as exposed by the API. The password hash is never selected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    /// `None` only for super admins
    pub school_id: Option<Uuid>,
    pub is_active: bool,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Row used by the login flow, including the bcrypt hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub school_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
    /// Required when a super admin creates a school account
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    pub role: Option<UserRole>,
    /// Matches first name, last name or email
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    /// Super admins only; ignored for school admins
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dto() -> CreateUserDto {
        CreateUserDto {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "ada@school.test".to_string(),
            password: "password123".to_string(),
            role: UserRole::SchoolAdmin,
            school_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_create_user_dto_valid() {
        assert!(create_dto().validate().is_ok());
    }

    #[test]
    fn test_create_user_dto_rejects_short_password_and_bad_email() {
        let dto = CreateUserDto {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            ..create_dto()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_create_user_dto_parses_role() {
        let json = r#"{
            "first_name": "A", "last_name": "B", "email": "a@b.test",
            "password": "password123", "role": "teacher"
        }"#;
        let dto: CreateUserDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.role, UserRole::Teacher);
        assert!(dto.school_id.is_none());
    }

    #[test]
    fn test_filter_params_role_from_query() {
        let params: UserFilterParams =
            serde_json::from_str(r#"{"role": "student", "school_id": ""}"#).unwrap();
        assert_eq!(params.role, Some(UserRole::Student));
        assert!(params.school_id.is_none());
    }
}
