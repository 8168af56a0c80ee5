//! Class models and DTOs.

use scholaris_core::serde::{
    deserialize_nullable, deserialize_optional_trimmed, deserialize_optional_uuid,
};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::students::Student;

/// A class (grade + section) inside a school, joined with its class teacher
/// name and enrollment count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Class {
    pub id: Uuid,
    pub school_id: Uuid,
    #[schema(example = "Grade 5")]
    pub name: String,
    #[schema(example = "A")]
    pub section: String,
    #[schema(example = "2025/2026")]
    pub academic_year: Option<String>,
    pub room: Option<String>,
    pub class_teacher_id: Option<Uuid>,
    pub class_teacher_name: Option<String>,
    pub student_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
    /// Must be a teacher of the same school
    pub class_teacher_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
    /// `null` unassigns the class teacher
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub class_teacher_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassFilterParams {
    /// Matches name or section
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub academic_year: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_teacher_id: Option<Uuid>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedClassesResponse {
    pub data: Vec<Class>,
    pub meta: PaginationMeta,
}

/// Roster returned by `GET /api/classes/{id}/students`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassRoster {
    pub class: Class,
    pub students: Vec<Student>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_class_dto_validation() {
        let dto = CreateClassDto {
            name: "Grade 5".to_string(),
            section: Some("A".to_string()),
            academic_year: Some("2025/2026".to_string()),
            room: None,
            class_teacher_id: None,
        };
        assert!(dto.validate().is_ok());

        let bad = CreateClassDto {
            name: String::new(),
            section: Some("a-section-name-that-is-too-long".to_string()),
            ..dto
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("section"));
    }
}
