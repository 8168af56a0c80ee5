use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta, UserRole};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::modules::users::{NewAccount, UserService};
use crate::utils::auth_helpers::{
    StudentScope, ensure_class_in_school, ensure_in_scope, push_school_scope,
};
use crate::utils::db::{like_pattern, unique_violation};

pub(crate) const STUDENT_SELECT: &str = r#"SELECT s.id, s.user_id, s.school_id, u.first_name, u.last_name,
       u.email, u.is_active, s.admission_number, s.class_id,
       NULLIF(TRIM(CONCAT(c.name, ' ', c.section)), '') AS class_name,
       s.parent_id, s.date_of_birth, s.gender, s.created_at, s.updated_at
FROM students s
JOIN users u ON u.id = s.user_id
LEFT JOIN classes c ON c.id = s.class_id"#;

const DUPLICATE_ADMISSION_NUMBER: &str = "A student with this admission number already exists";

async fn ensure_parent_in_school(db: &PgPool, parent_id: Uuid, school_id: Uuid) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM parents WHERE id = $1 AND school_id = $2)",
    )
    .bind(parent_id)
    .bind(school_id)
    .fetch_one(db)
    .await?;

    if !exists {
        return Err(AppError::bad_request(anyhow!("Parent does not belong to this school")));
    }
    Ok(())
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "students"))]
    pub async fn create_student(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        if let Some(class_id) = dto.class_id {
            ensure_class_in_school(db, class_id, school_id).await?;
        }
        if let Some(parent_id) = dto.parent_id {
            ensure_parent_in_school(db, parent_id, school_id).await?;
        }

        let mut tx = db.begin().await?;

        let user = UserService::insert_account(
            &mut *tx,
            NewAccount {
                first_name: &dto.first_name,
                last_name: &dto.last_name,
                email: &dto.email,
                password: &dto.password,
                role: UserRole::Student,
                school_id: Some(school_id),
            },
        )
        .await?;

        let student_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO students (user_id, school_id, admission_number, class_id, parent_id,
                                     date_of_birth, gender)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(user.id)
        .bind(school_id)
        .bind(dto.admission_number.trim())
        .bind(dto.class_id.is_some())
        .bind(dto.class_id.flatten())
        .bind(dto.parent_id.is_some())
        .bind(dto.parent_id.flatten())
        .bind(dto.date_of_birth)
        .bind(&dto.gender)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_ADMISSION_NUMBER))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "student", Some(student_id))
                .details(json!({
                    "email": user.email,
                    "admission_number": dto.admission_number,
                    "class_id": dto.class_id,
                })),
        )
        .await?;

        let student = sqlx::query_as::<_, Student>(&format!("{} WHERE s.id = $1", STUDENT_SELECT))
            .bind(student_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(student)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: &StudentFilterParams,
    ) {
        push_school_scope(qb, "s.school_id", scope);
        students.push_filter(qb, "s.id");

        if let Some(class_id) = filters.class_id {
            qb.push(" AND s.class_id = ");
            qb.push_bind(class_id);
        }
        if let Some(parent_id) = filters.parent_id {
            qb.push(" AND s.parent_id = ");
            qb.push_bind(parent_id);
        }
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (u.first_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.last_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.email ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR s.admission_number ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, students, filters), fields(db.operation = "SELECT", db.table = "students"))]
    pub async fn list_students(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM students s JOIN users u ON u.id = s.user_id WHERE TRUE",
        );
        Self::push_filters(&mut count, scope, students, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", STUDENT_SELECT));
        Self::push_filters(&mut query, scope, students, &filters);
        query.push(" ORDER BY u.last_name, u.first_name, s.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Student>().fetch_all(db).await?;

        Ok(PaginatedStudentsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    /// Every student enrolled in a class, by name.
    pub async fn students_in_class(db: &PgPool, class_id: Uuid) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "{} WHERE s.class_id = $1 ORDER BY u.last_name, u.first_name",
            STUDENT_SELECT
        ))
        .bind(class_id)
        .fetch_all(db)
        .await?;
        Ok(students)
    }

    pub async fn children_of_parent(db: &PgPool, parent_id: Uuid) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "{} WHERE s.parent_id = $1 ORDER BY u.last_name, u.first_name",
            STUDENT_SELECT
        ))
        .bind(parent_id)
        .fetch_all(db)
        .await?;
        Ok(students)
    }

    /// Profile row of a student account.
    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> Result<Option<Student>, AppError> {
        let student =
            sqlx::query_as::<_, Student>(&format!("{} WHERE s.user_id = $1", STUDENT_SELECT))
                .bind(user_id)
                .fetch_optional(db)
                .await?;
        Ok(student)
    }

    #[instrument(skip(db, students), fields(db.operation = "SELECT", db.table = "students"))]
    pub async fn get_student(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        students: &StudentScope,
    ) -> Result<Student, AppError> {
        students.ensure_allows(id, "Student")?;

        let student = sqlx::query_as::<_, Student>(&format!("{} WHERE s.id = $1", STUDENT_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;

        ensure_in_scope(scope, student.school_id, "Student")?;
        Ok(student)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "students"))]
    pub async fn update_student(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let existing = Self::get_student(db, id, scope, &StudentScope::Unrestricted).await?;

        if let Some(Some(class_id)) = dto.class_id {
            ensure_class_in_school(db, class_id, existing.school_id).await?;
        }
        if let Some(Some(parent_id)) = dto.parent_id {
            ensure_parent_in_school(db, parent_id, existing.school_id).await?;
        }

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
            r#"UPDATE students
               SET admission_number = COALESCE($2, admission_number),
                   class_id = CASE WHEN $3 THEN $4 ELSE class_id END,
                   parent_id = CASE WHEN $5 THEN $6 ELSE parent_id END,
                   date_of_birth = COALESCE($7, date_of_birth),
                   gender = COALESCE($8, gender),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.admission_number.as_deref().map(str::trim))
        .bind(dto.class_id.is_some())
        .bind(dto.class_id.flatten())
        .bind(dto.parent_id.is_some())
        .bind(dto.parent_id.flatten())
        .bind(dto.date_of_birth)
        .bind(&dto.gender)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_ADMISSION_NUMBER))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "student", Some(id))
                .details(json!({ "class_id": dto.class_id, "parent_id": dto.parent_id })),
        )
        .await?;

        let student = sqlx::query_as::<_, Student>(&format!("{} WHERE s.id = $1", STUDENT_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(student)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "students"))]
    pub async fn delete_student(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_student(db, id, scope, &StudentScope::Unrestricted).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(existing.user_id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "student", Some(id))
                .details(json!({ "admission_number": existing.admission_number })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
