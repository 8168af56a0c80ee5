//! Student profile models and DTOs.

use scholaris_core::serde::{
    deserialize_nullable, deserialize_optional_trimmed, deserialize_optional_uuid,
};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Student profile joined with the login account and class name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    #[schema(example = "ADM-2025-001")]
    pub admission_number: String,
    pub class_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub gender: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub admission_number: String,
    /// Must belong to the same school
    pub class_id: Option<Uuid>,
    /// Must belong to the same school
    pub parent_id: Option<Uuid>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub admission_number: Option<String>,
    /// `null` removes the student from their class
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub class_id: Option<Option<Uuid>>,
    /// `null` unlinks the parent
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub parent_id: Option<Option<Uuid>>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub parent_id: Option<Uuid>,
    /// Matches name, email or admission number
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateStudentDto {
        CreateStudentDto {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john.doe@school.test".to_string(),
            password: "password123".to_string(),
            admission_number: "ADM-1".to_string(),
            class_id: None,
            parent_id: None,
            date_of_birth: None,
            gender: Some("male".to_string()),
        }
    }

    #[test]
    fn test_create_student_dto_validation() {
        assert!(dto().validate().is_ok());
    }

    #[test]
    fn test_create_student_dto_invalid_fields() {
        let invalid = CreateStudentDto {
            first_name: String::new(),
            email: "invalid-email".to_string(),
            password: "short".to_string(),
            ..dto()
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_filter_params_defaults() {
        let params: StudentFilterParams = serde_json::from_str("{}").unwrap();
        assert!(params.class_id.is_none());
        assert_eq!(params.pagination.page(), 1);
        assert_eq!(params.pagination.limit(), 10);
    }
}
