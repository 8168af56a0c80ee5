//! Role-specific dashboard summaries.

use scholaris_core::UserRole;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::attendance::AttendanceSummary;
use crate::exams::{Exam, ExamResult};
use crate::fees::FeeSummary;
use crate::notices::Notice;
use crate::schools::{School, SchoolSummary};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuperAdminDashboard {
    pub total_schools: i64,
    pub total_users: i64,
    pub users_by_role: Vec<RoleCount>,
    pub recent_schools: Vec<School>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchoolAdminDashboard {
    pub school: SchoolSummary,
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_parents: i64,
    pub total_classes: i64,
    pub fees: FeeSummary,
    pub attendance_today: AttendanceSummary,
    pub recent_notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherDashboard {
    pub teacher_id: Uuid,
    pub classes_taught: i64,
    pub students_taught: i64,
    pub notices_authored: i64,
    pub upcoming_exams: Vec<Exam>,
    pub recent_notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub student_id: Uuid,
    pub class_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub attendance: AttendanceSummary,
    pub outstanding_fees_cents: i64,
    pub unpaid_fee_count: i64,
    pub upcoming_exams: Vec<Exam>,
    pub recent_results: Vec<ExamResult>,
    pub recent_notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChildSummary {
    pub student_id: Uuid,
    pub name: String,
    pub class_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub attendance: AttendanceSummary,
    pub outstanding_fees_cents: i64,
    pub upcoming_exam_count: i64,
    pub recent_results: Vec<ExamResult>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParentDashboard {
    pub parent_id: Uuid,
    pub children: Vec<ChildSummary>,
    pub recent_notices: Vec<Notice>,
}

/// `GET /api/dashboard` body, tagged with the caller's role.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    SuperAdmin(SuperAdminDashboard),
    SchoolAdmin(SchoolAdminDashboard),
    Teacher(TeacherDashboard),
    Student(StudentDashboard),
    Parent(ParentDashboard),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_is_tagged_with_role() {
        let dashboard = Dashboard::Parent(ParentDashboard {
            parent_id: Uuid::new_v4(),
            children: vec![],
            recent_notices: vec![],
        });
        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["role"], "parent");
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
