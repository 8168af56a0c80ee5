//! One summary per role, assembled from the other modules' services.

use anyhow::anyhow;
use scholaris_core::{AppError, PaginationParams, UserRole};
use scholaris_models::attendance::{AttendanceSummary, AttendanceSummaryParams};
use scholaris_models::dashboard::{
    ChildSummary, Dashboard, ParentDashboard, RoleCount, SchoolAdminDashboard, StudentDashboard,
    SuperAdminDashboard, TeacherDashboard,
};
use scholaris_models::exams::ResultFilterParams;
use scholaris_models::fees::FeeSummaryParams;
use scholaris_models::notices::{Notice, NoticeFilterParams};
use scholaris_models::schools::{School, SchoolSummary};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::attendance::AttendanceService;
use crate::modules::exams::ExamService;
use crate::modules::fees::FeeService;
use crate::modules::notices::{NoticeService, NoticeVisibility};
use crate::modules::schools::service::SCHOOL_COLUMNS;
use crate::modules::students::StudentService;
use crate::utils::auth_helpers::{StudentScope, own_school_id, teacher_id_for_user};

const RECENT_LIMIT: i64 = 5;

async fn count(db: &PgPool, sql: &str, id: Uuid) -> Result<i64, AppError> {
    let n = sqlx::query_scalar::<_, i64>(sql).bind(id).fetch_one(db).await?;
    Ok(n)
}

async fn recent_notices(
    db: &PgPool,
    school_id: Uuid,
    visibility: &NoticeVisibility,
) -> Result<Vec<Notice>, AppError> {
    let filters = NoticeFilterParams {
        pagination: PaginationParams::new(1, RECENT_LIMIT),
        ..Default::default()
    };
    let page = NoticeService::list_notices(db, Some(school_id), visibility, filters).await?;
    Ok(page.data)
}

async fn student_attendance(
    db: &PgPool,
    school_id: Uuid,
    student_id: Uuid,
) -> Result<AttendanceSummary, AppError> {
    AttendanceService::summary(
        db,
        Some(school_id),
        &StudentScope::Students(vec![student_id]),
        AttendanceSummaryParams {
            student_id: Some(student_id),
            ..Default::default()
        },
    )
    .await
}

async fn recent_results(
    db: &PgPool,
    school_id: Uuid,
    student_id: Uuid,
    limit: i64,
) -> Result<Vec<scholaris_models::exams::ExamResult>, AppError> {
    let filters = ResultFilterParams {
        student_id: Some(student_id),
        pagination: PaginationParams::new(1, limit),
        ..Default::default()
    };
    let page = ExamService::list_results(
        db,
        Some(school_id),
        &StudentScope::Students(vec![student_id]),
        filters,
    )
    .await?;
    Ok(page.data)
}

pub struct DashboardService;

impl DashboardService {
    #[instrument(skip(db, auth_user), fields(role = %auth_user.role()))]
    pub async fn for_user(db: &PgPool, auth_user: &AuthUser) -> Result<Dashboard, AppError> {
        match auth_user.role() {
            UserRole::SuperAdmin => Self::super_admin(db).await.map(Dashboard::SuperAdmin),
            UserRole::SchoolAdmin => {
                Self::school_admin(db, own_school_id(auth_user)?).await.map(Dashboard::SchoolAdmin)
            }
            UserRole::Teacher => Self::teacher(db, auth_user).await.map(Dashboard::Teacher),
            UserRole::Student => Self::student(db, auth_user).await.map(Dashboard::Student),
            UserRole::Parent => Self::parent(db, auth_user).await.map(Dashboard::Parent),
        }
    }

    async fn super_admin(db: &PgPool) -> Result<SuperAdminDashboard, AppError> {
        let total_schools = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools")
            .fetch_one(db)
            .await?;

        let users_by_role = sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(db)
        .await?;
        let total_users = users_by_role.iter().map(|r| r.count).sum();

        let recent_schools = sqlx::query_as::<_, School>(&format!(
            "SELECT {} FROM schools ORDER BY created_at DESC LIMIT $1",
            SCHOOL_COLUMNS
        ))
        .bind(RECENT_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(SuperAdminDashboard {
            total_schools,
            total_users,
            users_by_role,
            recent_schools,
        })
    }

    async fn school_admin(db: &PgPool, school_id: Uuid) -> Result<SchoolAdminDashboard, AppError> {
        let school = sqlx::query_as::<_, SchoolSummary>(
            "SELECT id, name, code FROM schools WHERE id = $1",
        )
        .bind(school_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        let total_students =
            count(db, "SELECT COUNT(*) FROM students WHERE school_id = $1", school_id).await?;
        let total_teachers =
            count(db, "SELECT COUNT(*) FROM teachers WHERE school_id = $1", school_id).await?;
        let total_parents =
            count(db, "SELECT COUNT(*) FROM parents WHERE school_id = $1", school_id).await?;
        let total_classes =
            count(db, "SELECT COUNT(*) FROM classes WHERE school_id = $1", school_id).await?;

        let fees = FeeService::summary(
            db,
            Some(school_id),
            &StudentScope::Unrestricted,
            FeeSummaryParams::default(),
        )
        .await?;

        let today = chrono::Utc::now().date_naive();
        let attendance_today = AttendanceService::summary(
            db,
            Some(school_id),
            &StudentScope::Unrestricted,
            AttendanceSummaryParams {
                date_from: Some(today),
                date_to: Some(today),
                ..Default::default()
            },
        )
        .await?;

        let recent_notices =
            recent_notices(db, school_id, &NoticeVisibility::for_admin(None)).await?;

        Ok(SchoolAdminDashboard {
            school,
            total_students,
            total_teachers,
            total_parents,
            total_classes,
            fees,
            attendance_today,
            recent_notices,
        })
    }

    async fn teacher(db: &PgPool, auth_user: &AuthUser) -> Result<TeacherDashboard, AppError> {
        let school_id = own_school_id(auth_user)?;
        let user_id = auth_user.user_id()?;
        let teacher_id = teacher_id_for_user(db, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher profile not found")))?;

        let class_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM classes WHERE class_teacher_id = $1",
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await?;

        let students_taught = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE class_id = ANY($1)",
        )
        .bind(&class_ids)
        .fetch_one(db)
        .await?;
        let notices_authored =
            count(db, "SELECT COUNT(*) FROM notices WHERE author_id = $1", user_id).await?;

        let upcoming_exams = ExamService::upcoming_exams(db, &class_ids, RECENT_LIMIT).await?;
        let visibility = NoticeVisibility::for_user(db, auth_user, None).await?;
        let recent_notices = recent_notices(db, school_id, &visibility).await?;

        Ok(TeacherDashboard {
            teacher_id,
            classes_taught: class_ids.len() as i64,
            students_taught,
            notices_authored,
            upcoming_exams,
            recent_notices,
        })
    }

    async fn student(db: &PgPool, auth_user: &AuthUser) -> Result<StudentDashboard, AppError> {
        let school_id = own_school_id(auth_user)?;
        let student = StudentService::find_by_user(db, auth_user.user_id()?)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student profile not found")))?;

        let attendance = student_attendance(db, school_id, student.id).await?;
        let (outstanding_fees_cents, unpaid_fee_count) =
            FeeService::outstanding_for_student(db, student.id).await?;

        let class_ids: Vec<Uuid> = student.class_id.into_iter().collect();
        let upcoming_exams = ExamService::upcoming_exams(db, &class_ids, RECENT_LIMIT).await?;
        let recent_results = recent_results(db, school_id, student.id, RECENT_LIMIT).await?;

        let visibility = NoticeVisibility::for_user(db, auth_user, None).await?;
        let recent_notices = recent_notices(db, school_id, &visibility).await?;

        Ok(StudentDashboard {
            student_id: student.id,
            class_id: student.class_id,
            class_name: student.class_name,
            attendance,
            outstanding_fees_cents,
            unpaid_fee_count,
            upcoming_exams,
            recent_results,
            recent_notices,
        })
    }

    async fn parent(db: &PgPool, auth_user: &AuthUser) -> Result<ParentDashboard, AppError> {
        let school_id = own_school_id(auth_user)?;
        let parent_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM parents WHERE user_id = $1")
            .bind(auth_user.user_id()?)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Parent profile not found")))?;

        let mut children = Vec::new();
        for child in StudentService::children_of_parent(db, parent_id).await? {
            let attendance = student_attendance(db, school_id, child.id).await?;
            let (outstanding_fees_cents, _) =
                FeeService::outstanding_for_student(db, child.id).await?;
            let upcoming_exam_count = match child.class_id {
                Some(class_id) => ExamService::count_upcoming(db, class_id).await?,
                None => 0,
            };
            let recent_results = recent_results(db, school_id, child.id, 3).await?;

            children.push(ChildSummary {
                student_id: child.id,
                name: format!("{} {}", child.first_name, child.last_name),
                class_id: child.class_id,
                class_name: child.class_name,
                attendance,
                outstanding_fees_cents,
                upcoming_exam_count,
                recent_results,
            });
        }

        let visibility = NoticeVisibility::for_user(db, auth_user, None).await?;
        let recent_notices = recent_notices(db, school_id, &visibility).await?;

        Ok(ParentDashboard {
            parent_id,
            children,
            recent_notices,
        })
    }
}
