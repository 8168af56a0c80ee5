use scholaris_core::{PaginationMeta, UserRole};
use scholaris_models::attendance::{
    AttendanceEntryDto, AttendanceRecord, AttendanceStatus, AttendanceSummary,
    MarkAttendanceDto, MarkAttendanceResponse, PaginatedAttendanceResponse, UpdateAttendanceDto,
};
use scholaris_models::audit::{AuditAction, AuditLog, PaginatedAuditLogsResponse};
use scholaris_models::auth::{
    AuthUserProfile, ChangePasswordDto, LoginRequest, LoginResponse, MessageResponse,
    RefreshTokenRequest, RefreshTokenResponse,
};
use scholaris_models::classes::{
    Class, ClassRoster, CreateClassDto, PaginatedClassesResponse, UpdateClassDto,
};
use scholaris_models::dashboard::{
    ChildSummary, Dashboard, ParentDashboard, RoleCount, SchoolAdminDashboard, StudentDashboard,
    SuperAdminDashboard, TeacherDashboard,
};
use scholaris_models::exams::{
    CreateExamDto, Exam, ExamResult, PaginatedExamsResponse, PaginatedResultsResponse,
    RecordResultsDto, RecordResultsResponse, ResultEntryDto, UpdateExamDto,
};
use scholaris_models::fees::{
    CreateFeeDto, Fee, FeeDetails, FeePayment, FeeStatus, FeeSummary, PaginatedFeesResponse,
    PaymentReceipt, RecordPaymentDto, UpdateFeeDto,
};
use scholaris_models::messages::{
    Message, MessageFolder, PaginatedMessagesResponse, SendMessageDto,
};
use scholaris_models::notices::{
    CreateNoticeDto, Notice, NoticeAudience, NoticePriority, PaginatedNoticesResponse,
    UpdateNoticeDto,
};
use scholaris_models::parents::{CreateParentDto, PaginatedParentsResponse, Parent, UpdateParentDto};
use scholaris_models::schools::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolSummary, SchoolWithStats,
    UpdateSchoolDto,
};
use scholaris_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use scholaris_models::teachers::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, UpdateTeacherDto,
};
use scholaris_models::users::{CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::me,
        crate::modules::auth::controller::change_password,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::get_classes,
        crate::modules::classes::controller::get_class,
        crate::modules::classes::controller::get_class_roster,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::delete_class,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::get_teachers,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::parents::controller::create_parent,
        crate::modules::parents::controller::get_parents,
        crate::modules::parents::controller::get_parent,
        crate::modules::parents::controller::get_parent_children,
        crate::modules::parents::controller::update_parent,
        crate::modules::parents::controller::delete_parent,
        crate::modules::notices::controller::create_notice,
        crate::modules::notices::controller::get_notices,
        crate::modules::notices::controller::get_notice,
        crate::modules::notices::controller::update_notice,
        crate::modules::notices::controller::delete_notice,
        crate::modules::exams::controller::create_exam,
        crate::modules::exams::controller::get_exams,
        crate::modules::exams::controller::get_exam,
        crate::modules::exams::controller::update_exam,
        crate::modules::exams::controller::delete_exam,
        crate::modules::exams::controller::record_results,
        crate::modules::exams::controller::get_exam_results,
        crate::modules::exams::controller::get_results,
        crate::modules::fees::controller::create_fee,
        crate::modules::fees::controller::get_fees,
        crate::modules::fees::controller::get_fee_summary,
        crate::modules::fees::controller::get_fee,
        crate::modules::fees::controller::update_fee,
        crate::modules::fees::controller::delete_fee,
        crate::modules::fees::controller::record_payment,
        crate::modules::attendance::controller::mark_attendance,
        crate::modules::attendance::controller::get_attendance,
        crate::modules::attendance::controller::get_attendance_summary,
        crate::modules::attendance::controller::update_attendance,
        crate::modules::attendance::controller::delete_attendance,
        crate::modules::messages::controller::send_message,
        crate::modules::messages::controller::get_messages,
        crate::modules::messages::controller::get_message,
        crate::modules::messages::controller::mark_message_read,
        crate::modules::messages::controller::delete_message,
        crate::modules::audit_logs::controller::list_audit_logs,
        crate::modules::dashboard::controller::get_dashboard,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            UserRole,
            LoginRequest,
            LoginResponse,
            AuthUserProfile,
            RefreshTokenRequest,
            RefreshTokenResponse,
            ChangePasswordDto,
            MessageResponse,
            School,
            SchoolSummary,
            SchoolWithStats,
            CreateSchoolDto,
            UpdateSchoolDto,
            PaginatedSchoolsResponse,
            User,
            CreateUserDto,
            UpdateUserDto,
            PaginatedUsersResponse,
            Class,
            ClassRoster,
            CreateClassDto,
            UpdateClassDto,
            PaginatedClassesResponse,
            Teacher,
            CreateTeacherDto,
            UpdateTeacherDto,
            PaginatedTeachersResponse,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            Parent,
            CreateParentDto,
            UpdateParentDto,
            PaginatedParentsResponse,
            Notice,
            NoticeAudience,
            NoticePriority,
            CreateNoticeDto,
            UpdateNoticeDto,
            PaginatedNoticesResponse,
            Exam,
            CreateExamDto,
            UpdateExamDto,
            PaginatedExamsResponse,
            ExamResult,
            ResultEntryDto,
            RecordResultsDto,
            RecordResultsResponse,
            PaginatedResultsResponse,
            Fee,
            FeeStatus,
            FeePayment,
            FeeDetails,
            FeeSummary,
            CreateFeeDto,
            UpdateFeeDto,
            RecordPaymentDto,
            PaymentReceipt,
            PaginatedFeesResponse,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceEntryDto,
            MarkAttendanceDto,
            MarkAttendanceResponse,
            UpdateAttendanceDto,
            AttendanceSummary,
            PaginatedAttendanceResponse,
            Message,
            MessageFolder,
            SendMessageDto,
            PaginatedMessagesResponse,
            AuditLog,
            AuditAction,
            PaginatedAuditLogsResponse,
            Dashboard,
            RoleCount,
            SuperAdminDashboard,
            SchoolAdminDashboard,
            TeacherDashboard,
            StudentDashboard,
            ChildSummary,
            ParentDashboard,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh and password changes"),
        (name = "Schools", description = "Tenant management for super admins"),
        (name = "Users", description = "Staff accounts within a school"),
        (name = "Classes", description = "Classes and their rosters"),
        (name = "Teachers", description = "Teacher profiles"),
        (name = "Students", description = "Student profiles and enrollment"),
        (name = "Parents", description = "Parent profiles and linked children"),
        (name = "Notices", description = "Audience-targeted announcements"),
        (name = "Exams", description = "Exams and recorded results"),
        (name = "Fees", description = "Fee invoices and payments"),
        (name = "Attendance", description = "Daily attendance records"),
        (name = "Messages", description = "Direct messages between users"),
        (name = "Audit Logs", description = "Trail of mutating operations"),
        (name = "Dashboard", description = "Role-specific overview")
    ),
    info(
        title = "Scholaris API",
        version = "0.1.0",
        description = "Multi-tenant school management REST API built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
