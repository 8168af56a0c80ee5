//! School (tenant) models and DTOs.

use scholaris_core::serde::deserialize_optional_trimmed;
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// A school. Every other tenant-owned row points at one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    /// Short unique code, e.g. `GHS-01`
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Minimal school info embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SchoolSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

/// School with head counts, returned by `GET /api/schools/{id}`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SchoolWithStats {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub admin_count: i64,
    pub teacher_count: i64,
    pub student_count: i64,
    pub parent_count: i64,
    pub class_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 2, max = 50))]
    #[schema(example = "GHS-01")]
    pub code: String,
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub code: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolFilterParams {
    /// Case-insensitive substring match on the name
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub name: Option<String>,
    /// Case-insensitive substring match on the code
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedSchoolsResponse {
    pub data: Vec<School>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_school_dto_validation() {
        let dto = CreateSchoolDto {
            name: "Green Hill".to_string(),
            code: "GH".to_string(),
            address: None,
            phone: None,
            email: Some("office@greenhill.test".to_string()),
        };
        assert!(dto.validate().is_ok());

        let bad = CreateSchoolDto {
            code: "G".to_string(),
            email: Some("nope".to_string()),
            ..dto
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("code"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_filter_params_from_query_string_values() {
        let params: SchoolFilterParams =
            serde_json::from_str(r#"{"name": "", "code": "GH", "page": "2"}"#).unwrap();
        assert!(params.name.is_none());
        assert_eq!(params.code.as_deref(), Some("GH"));
        assert_eq!(params.pagination.page(), 2);
    }
}
