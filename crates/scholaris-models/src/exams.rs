//! Exams, results and grading.

use scholaris_core::serde::{deserialize_optional_trimmed, deserialize_optional_uuid};
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Letter grade for `marks` out of `max_marks`.
///
/// Anything below `passing_marks` is an `F` regardless of percentage.
pub fn compute_grade(marks: f64, max_marks: i32, passing_marks: i32) -> &'static str {
    if max_marks <= 0 || marks < f64::from(passing_marks) {
        return "F";
    }

    let percentage = marks / f64::from(max_marks) * 100.0;
    match percentage {
        p if p >= 90.0 => "A+",
        p if p >= 80.0 => "A",
        p if p >= 70.0 => "B",
        p if p >= 60.0 => "C",
        p if p >= 50.0 => "D",
        _ => "F",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Exam {
    pub id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub class_name: Option<String>,
    #[schema(example = "First Term Examination")]
    pub name: String,
    #[schema(example = "Mathematics")]
    pub subject: String,
    pub description: Option<String>,
    pub exam_date: chrono::NaiveDate,
    pub max_marks: i32,
    pub passing_marks: i32,
    pub created_by: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

fn validate_passing_marks(dto: &CreateExamDto) -> Result<(), ValidationError> {
    if dto.passing_marks > dto.max_marks {
        let mut err = ValidationError::new("passing_marks_exceeds_max");
        err.message = Some("passing_marks cannot exceed max_marks".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_passing_marks"))]
pub struct CreateExamDto {
    pub class_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub description: Option<String>,
    pub exam_date: chrono::NaiveDate,
    #[validate(range(min = 1, max = 1000))]
    pub max_marks: i32,
    #[validate(range(min = 0, max = 1000))]
    pub passing_marks: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateExamDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    pub description: Option<String>,
    pub exam_date: Option<chrono::NaiveDate>,
    #[validate(range(min = 1, max = 1000))]
    pub max_marks: Option<i32>,
    #[validate(range(min = 0, max = 1000))]
    pub passing_marks: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExamFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub subject: Option<String>,
    /// Exams on or after this date
    pub date_from: Option<chrono::NaiveDate>,
    /// Exams on or before this date
    pub date_to: Option<chrono::NaiveDate>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedExamsResponse {
    pub data: Vec<Exam>,
    pub meta: PaginationMeta,
}

/// A student's result for one exam.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ExamResult {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub exam_name: String,
    pub subject: String,
    pub exam_date: chrono::NaiveDate,
    pub student_id: Uuid,
    pub student_name: String,
    pub admission_number: String,
    pub marks_obtained: f64,
    pub max_marks: i32,
    pub grade: String,
    pub passed: bool,
    pub remarks: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResultEntryDto {
    pub student_id: Uuid,
    #[validate(range(min = 0.0))]
    pub marks_obtained: f64,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Bulk upsert body for `POST /api/exams/{id}/results`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordResultsDto {
    #[validate(length(min = 1, max = 500), nested)]
    pub results: Vec<ResultEntryDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordResultsResponse {
    pub exam_id: Uuid,
    pub recorded: usize,
    pub results: Vec<ExamResult>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResultFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub exam_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub subject: Option<String>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResultsResponse {
    pub data: Vec<ExamResult>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(compute_grade(95.0, 100, 40), "A+");
        assert_eq!(compute_grade(90.0, 100, 40), "A+");
        assert_eq!(compute_grade(89.9, 100, 40), "A");
        assert_eq!(compute_grade(80.0, 100, 40), "A");
        assert_eq!(compute_grade(70.0, 100, 40), "B");
        assert_eq!(compute_grade(60.0, 100, 40), "C");
        assert_eq!(compute_grade(50.0, 100, 40), "D");
        assert_eq!(compute_grade(49.0, 100, 40), "F");
    }

    #[test]
    fn test_grade_uses_percentage() {
        assert_eq!(compute_grade(45.0, 50, 20), "A+");
        assert_eq!(compute_grade(30.0, 50, 20), "C");
    }

    #[test]
    fn test_below_passing_is_always_f() {
        assert_eq!(compute_grade(55.0, 100, 60), "F");
        assert_eq!(compute_grade(60.0, 100, 60), "C");
    }

    #[test]
    fn test_zero_max_marks_is_f() {
        assert_eq!(compute_grade(10.0, 0, 0), "F");
    }

    fn exam_dto(max_marks: i32, passing_marks: i32) -> CreateExamDto {
        CreateExamDto {
            class_id: Uuid::new_v4(),
            name: "Midterm".to_string(),
            subject: "Physics".to_string(),
            description: None,
            exam_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            max_marks,
            passing_marks,
        }
    }

    #[test]
    fn test_create_exam_passing_within_max() {
        assert!(exam_dto(100, 40).validate().is_ok());
        assert!(exam_dto(100, 100).validate().is_ok());
        assert!(exam_dto(50, 60).validate().is_err());
        assert!(exam_dto(0, 0).validate().is_err());
    }

    #[test]
    fn test_record_results_validates_entries() {
        let dto = RecordResultsDto {
            results: vec![ResultEntryDto {
                student_id: Uuid::new_v4(),
                marks_obtained: -1.0,
                remarks: None,
            }],
        };
        assert!(dto.validate().is_err());

        let empty = RecordResultsDto { results: vec![] };
        assert!(empty.validate().is_err());
    }
}
