//! Teacher profile models and DTOs.

use scholaris_core::serde::{deserialize_optional_trimmed, deserialize_optional_uuid};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Teacher profile joined with the login account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    #[schema(example = "EMP-0042")]
    pub employee_number: String,
    pub subject_specialization: Option<String>,
    pub qualification: Option<String>,
    pub phone: Option<String>,
    pub hire_date: Option<chrono::NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub employee_number: String,
    #[validate(length(max = 100))]
    pub subject_specialization: Option<String>,
    #[validate(length(max = 255))]
    pub qualification: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub hire_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub employee_number: Option<String>,
    #[validate(length(max = 100))]
    pub subject_specialization: Option<String>,
    #[validate(length(max = 255))]
    pub qualification: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub hire_date: Option<chrono::NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherFilterParams {
    /// Matches name, email or employee number
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub subject: Option<String>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedTeachersResponse {
    pub data: Vec<Teacher>,
    pub meta: PaginationMeta,
}
