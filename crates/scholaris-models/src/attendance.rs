//! Daily attendance models.

use scholaris_core::serde::deserialize_optional_uuid;
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "attendance_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Late still counts as attended.
    pub fn counts_as_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub class_id: Uuid,
    pub attendance_date: chrono::NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttendanceEntryDto {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Marks a whole class for one day. Existing entries for the same student
/// and date are overwritten.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceDto {
    pub class_id: Uuid,
    pub date: chrono::NaiveDate,
    #[validate(length(min = 1, max = 500), nested)]
    pub entries: Vec<AttendanceEntryDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub class_id: Uuid,
    pub date: chrono::NaiveDate,
    pub marked: usize,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAttendanceDto {
    pub status: Option<AttendanceStatus>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedAttendanceResponse {
    pub data: Vec<AttendanceRecord>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceSummaryParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub class_id: Option<Uuid>,
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
}

/// Raw per-status counts as selected from the database.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct AttendanceCounts {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    /// Present plus late over total, as a percentage with two decimals
    pub attendance_rate: f64,
}

impl AttendanceSummary {
    pub fn from_counts(counts: AttendanceCounts) -> Self {
        let total = counts.present + counts.absent + counts.late + counts.excused;
        let attendance_rate = if total == 0 {
            0.0
        } else {
            let rate = (counts.present + counts.late) as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };

        Self {
            total,
            present: counts.present,
            absent: counts.absent,
            late: counts.late,
            excused: counts.excused,
            attendance_rate,
        }
    }
}
