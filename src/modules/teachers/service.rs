use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta, UserRole};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::teachers::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, TeacherFilterParams, UpdateTeacherDto,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::modules::users::{NewAccount, UserService};
use crate::utils::auth_helpers::{ensure_in_scope, push_school_scope};
use crate::utils::db::{like_pattern, unique_violation};

const TEACHER_SELECT: &str = r#"SELECT t.id, t.user_id, t.school_id, u.first_name, u.last_name,
       u.email, u.is_active, t.employee_number, t.subject_specialization,
       t.qualification, t.phone, t.hire_date, t.created_at, t.updated_at
FROM teachers t
JOIN users u ON u.id = t.user_id"#;

const DUPLICATE_EMPLOYEE_NUMBER: &str = "A teacher with this employee number already exists";

pub struct TeacherService;

impl TeacherService {
    /// Creates the login account and the teacher profile together.
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "teachers"))]
    pub async fn create_teacher(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateTeacherDto,
    ) -> Result<Teacher, AppError> {
        let mut tx = db.begin().await?;

        let user = UserService::insert_account(
            &mut *tx,
            NewAccount {
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                email: &dto.email,
                password: &dto.password,
                role: UserRole::Teacher,
                school_id: Some(school_id),
            },
        )
        .await?;

        let teacher_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO teachers (user_id, school_id, employee_number, subject_specialization,
                                     qualification, phone, hire_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(user.id)
        .bind(school_id)
        .bind(dto.employee_number.trim())
        .bind(&dto.subject_specialization)
        .bind(&dto.qualification)
        .bind(&dto.phone)
        .bind(dto.hire_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_EMPLOYEE_NUMBER))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "teacher", Some(teacher_id))
                .details(json!({ "email": user.email, "employee_number": dto.employee_number })),
        )
        .await?;

        let teacher = sqlx::query_as::<_, Teacher>(&format!("{} WHERE t.id = $1", TEACHER_SELECT))
            .bind(teacher_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(teacher)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        filters: &TeacherFilterParams,
    ) {
        push_school_scope(qb, "t.school_id", scope);
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (u.first_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.last_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.email ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR t.employee_number ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(subject) = &filters.subject {
            qb.push(" AND t.subject_specialization ILIKE ");
            qb.push_bind(like_pattern(subject));
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "teachers"))]
    pub async fn list_teachers(
        db: &PgPool,
        scope: Option<Uuid>,
        filters: TeacherFilterParams,
    ) -> Result<PaginatedTeachersResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM teachers t JOIN users u ON u.id = t.user_id WHERE TRUE",
        );
        Self::push_filters(&mut count, scope, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", TEACHER_SELECT));
        Self::push_filters(&mut query, scope, &filters);
        query.push(" ORDER BY u.last_name, u.first_name, t.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Teacher>().fetch_all(db).await?;

        Ok(PaginatedTeachersResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "teachers"))]
    pub async fn get_teacher(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<Teacher, AppError> {
        let teacher = sqlx::query_as::<_, Teacher>(&format!("{} WHERE t.id = $1", TEACHER_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))?;

        ensure_in_scope(scope, teacher.school_id, "Teacher")?;
        Ok(teacher)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "teachers"))]
    pub async fn update_teacher(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        let existing = Self::get_teacher(db, id, scope).await?;

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   is_active = COALESCE($4, is_active),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(existing.user_id)
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.is_active)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE teachers
               SET employee_number = COALESCE($2, employee_number),
                   subject_specialization = COALESCE($3, subject_specialization),
                   qualification = COALESCE($4, qualification),
                   phone = COALESCE($5, phone),
                   hire_date = COALESCE($6, hire_date),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.employee_number.as_deref().map(str::trim))
        .bind(&dto.subject_specialization)
        .bind(&dto.qualification)
        .bind(&dto.phone)
        .bind(dto.hire_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_EMPLOYEE_NUMBER))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "teacher", Some(id)),
        )
        .await?;

        let teacher = sqlx::query_as::<_, Teacher>(&format!("{} WHERE t.id = $1", TEACHER_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(teacher)
    }

    /// Deletes the teacher's account; the profile goes with it and classes
    /// they led lose their class teacher.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "teachers"))]
    pub async fn delete_teacher(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_teacher(db, id, scope).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(existing.user_id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "teacher", Some(id))
                .details(json!({ "email": existing.email })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
