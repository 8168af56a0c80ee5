use std::collections::HashSet;

use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::exams::{
    CreateExamDto, Exam, ExamFilterParams, ExamResult, PaginatedExamsResponse,
    PaginatedResultsResponse, RecordResultsDto, RecordResultsResponse, ResultEntryDto,
    ResultFilterParams, UpdateExamDto, compute_grade,
};
use scholaris_observability::track_results_recorded;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{
    StudentScope, ensure_class_in_school, ensure_in_scope, push_school_scope,
};
use crate::utils::db::like_pattern;

const EXAM_SELECT: &str = r#"SELECT e.id, e.school_id, e.class_id,
       NULLIF(TRIM(CONCAT(c.name, ' ', c.section)), '') AS class_name,
       e.name, e.subject, e.description, e.exam_date, e.max_marks, e.passing_marks,
       e.created_by, e.created_at, e.updated_at
FROM exams e
JOIN classes c ON c.id = e.class_id"#;

const RESULT_SELECT: &str = r#"SELECT r.id, r.exam_id, e.name AS exam_name, e.subject, e.exam_date,
       r.student_id, CONCAT(u.first_name, ' ', u.last_name) AS student_name,
       s.admission_number, r.marks_obtained, e.max_marks, r.grade,
       (r.marks_obtained >= e.passing_marks) AS passed, r.remarks,
       r.created_at, r.updated_at
FROM exam_results r
JOIN exams e ON e.id = r.exam_id
JOIN students s ON s.id = r.student_id
JOIN users u ON u.id = s.user_id"#;

/// Rejects batches that repeat a student or award more than the exam allows.
fn check_entries(entries: &[ResultEntryDto], max_marks: i32) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.student_id) {
            return Err(AppError::bad_request(anyhow!(
                "Student {} appears more than once",
                entry.student_id
            )));
        }
        if entry.marks_obtained > f64::from(max_marks) {
            return Err(AppError::bad_request(anyhow!(
                "marks_obtained for student {} exceeds max_marks ({})",
                entry.student_id,
                max_marks
            )));
        }
    }
    Ok(())
}

fn push_class_restriction(qb: &mut QueryBuilder<'_, Postgres>, class_ids: &Option<Vec<Uuid>>) {
    if let Some(ids) = class_ids {
        qb.push(" AND e.class_id = ANY(");
        qb.push_bind(ids.clone());
        qb.push(")");
    }
}

pub struct ExamService;

impl ExamService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "exams"))]
    pub async fn create_exam(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateExamDto,
    ) -> Result<Exam, AppError> {
        ensure_class_in_school(db, dto.class_id, school_id).await?;

        let mut tx = db.begin().await?;

        let exam_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO exams (school_id, class_id, name, subject, description, exam_date,
                                  max_marks, passing_marks, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(school_id)
        .bind(dto.class_id)
        .bind(dto.name.trim())
        .bind(dto.subject.trim())
        .bind(&dto.description)
        .bind(dto.exam_date)
        .bind(dto.max_marks)
        .bind(dto.passing_marks)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "exam", Some(exam_id))
                .details(json!({
                    "name": dto.name,
                    "subject": dto.subject,
                    "class_id": dto.class_id,
                })),
        )
        .await?;

        let exam = sqlx::query_as::<_, Exam>(&format!("{} WHERE e.id = $1", EXAM_SELECT))
            .bind(exam_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(exam)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        class_ids: &Option<Vec<Uuid>>,
        filters: &ExamFilterParams,
    ) {
        push_school_scope(qb, "e.school_id", scope);
        push_class_restriction(qb, class_ids);

        if let Some(class_id) = filters.class_id {
            qb.push(" AND e.class_id = ");
            qb.push_bind(class_id);
        }
        if let Some(subject) = &filters.subject {
            qb.push(" AND e.subject ILIKE ");
            qb.push_bind(like_pattern(subject));
        }
        if let Some(from) = filters.date_from {
            qb.push(" AND e.exam_date >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filters.date_to {
            qb.push(" AND e.exam_date <= ");
            qb.push_bind(to);
        }
    }

    /// `class_ids` limits students and parents to exams of their classes.
    #[instrument(skip(db, class_ids, filters), fields(db.operation = "SELECT", db.table = "exams"))]
    pub async fn list_exams(
        db: &PgPool,
        scope: Option<Uuid>,
        class_ids: &Option<Vec<Uuid>>,
        filters: ExamFilterParams,
    ) -> Result<PaginatedExamsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams e WHERE TRUE");
        Self::push_filters(&mut count, scope, class_ids, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", EXAM_SELECT));
        Self::push_filters(&mut query, scope, class_ids, &filters);
        query.push(" ORDER BY e.exam_date DESC, e.name, e.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Exam>().fetch_all(db).await?;

        Ok(PaginatedExamsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db, class_ids), fields(db.operation = "SELECT", db.table = "exams"))]
    pub async fn get_exam(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        class_ids: &Option<Vec<Uuid>>,
    ) -> Result<Exam, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!("{} WHERE e.id = $1", EXAM_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Exam not found")))?;

        ensure_in_scope(scope, exam.school_id, "Exam")?;
        if let Some(ids) = class_ids
            && !ids.contains(&exam.class_id)
        {
            return Err(AppError::not_found(anyhow!("Exam not found")));
        }
        Ok(exam)
    }

    /// Changing the marking scheme regrades every recorded result.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "exams"))]
    pub async fn update_exam(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateExamDto,
    ) -> Result<Exam, AppError> {
        let existing = Self::get_exam(db, id, scope, &None).await?;

        let max_marks = dto.max_marks.unwrap_or(existing.max_marks);
        let passing_marks = dto.passing_marks.unwrap_or(existing.passing_marks);
        if passing_marks > max_marks {
            return Err(AppError::unprocessable(anyhow!(
                "passing_marks cannot exceed max_marks"
            )));
        }

        let mut tx = db.begin().await?;

        let results = sqlx::query_as::<_, (Uuid, f64)>(
            "SELECT id, marks_obtained FROM exam_results WHERE exam_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if results.iter().any(|(_, marks)| *marks > f64::from(max_marks)) {
            return Err(AppError::bad_request(anyhow!(
                "max_marks cannot be lower than marks already recorded"
            )));
        }

        sqlx::query(
            r#"UPDATE exams
               SET name = COALESCE($2, name),
                   subject = COALESCE($3, subject),
                   description = COALESCE($4, description),
                   exam_date = COALESCE($5, exam_date),
                   max_marks = $6,
                   passing_marks = $7,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.exam_date)
        .bind(max_marks)
        .bind(passing_marks)
        .execute(&mut *tx)
        .await?;

        if max_marks != existing.max_marks || passing_marks != existing.passing_marks {
            for (result_id, marks) in &results {
                sqlx::query("UPDATE exam_results SET grade = $2, updated_at = NOW() WHERE id = $1")
                    .bind(result_id)
                    .bind(compute_grade(*marks, max_marks, passing_marks))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "exam", Some(id))
                .details(json!({
                    "max_marks": max_marks,
                    "passing_marks": passing_marks,
                    "regraded": results.len(),
                })),
        )
        .await?;

        let exam = sqlx::query_as::<_, Exam>(&format!("{} WHERE e.id = $1", EXAM_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(exam)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "exams"))]
    pub async fn delete_exam(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_exam(db, id, scope, &None).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "exam", Some(id))
                .details(json!({ "name": existing.name, "subject": existing.subject })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Upserts one result per student. Every student must be enrolled in the
    /// exam's class; the whole batch is rejected otherwise.
    #[instrument(skip(db, dto), fields(db.operation = "UPSERT", db.table = "exam_results"))]
    pub async fn record_results(
        db: &PgPool,
        actor_id: Uuid,
        exam_id: Uuid,
        scope: Option<Uuid>,
        dto: RecordResultsDto,
    ) -> Result<RecordResultsResponse, AppError> {
        let exam = Self::get_exam(db, exam_id, scope, &None).await?;
        check_entries(&dto.results, exam.max_marks)?;

        let student_ids: Vec<Uuid> = dto.results.iter().map(|r| r.student_id).collect();
        let enrolled = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM students WHERE id = ANY($1) AND class_id = $2",
        )
        .bind(&student_ids)
        .bind(exam.class_id)
        .fetch_all(db)
        .await?;

        if let Some(missing) = student_ids.iter().find(|id| !enrolled.contains(id)) {
            return Err(AppError::bad_request(anyhow!(
                "Student {} is not enrolled in this exam's class",
                missing
            )));
        }

        let mut tx = db.begin().await?;

        for entry in &dto.results {
            sqlx::query(
                r#"INSERT INTO exam_results (exam_id, student_id, marks_obtained, grade, remarks,
                                             recorded_by)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT (exam_id, student_id) DO UPDATE
                   SET marks_obtained = EXCLUDED.marks_obtained,
                       grade = EXCLUDED.grade,
                       remarks = EXCLUDED.remarks,
                       recorded_by = EXCLUDED.recorded_by,
                       updated_at = NOW()"#,
            )
            .bind(exam_id)
            .bind(entry.student_id)
            .bind(entry.marks_obtained)
            .bind(compute_grade(entry.marks_obtained, exam.max_marks, exam.passing_marks))
            .bind(&entry.remarks)
            .bind(actor_id)
            .execute(&mut *tx)
            .await?;
        }

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(exam.school_id), AuditAction::Update, "exam_results", Some(exam_id))
                .details(json!({ "recorded": dto.results.len() })),
        )
        .await?;

        let results = sqlx::query_as::<_, ExamResult>(&format!(
            "{} WHERE r.exam_id = $1 AND r.student_id = ANY($2) ORDER BY u.last_name, u.first_name",
            RESULT_SELECT
        ))
        .bind(exam_id)
        .bind(&student_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        track_results_recorded(results.len());
        Ok(RecordResultsResponse {
            exam_id,
            recorded: results.len(),
            results,
        })
    }

    pub async fn exam_results(
        db: &PgPool,
        exam_id: Uuid,
        scope: Option<Uuid>,
        students: &StudentScope,
    ) -> Result<Vec<ExamResult>, AppError> {
        let class_ids = students.class_ids(db).await?;
        Self::get_exam(db, exam_id, scope, &class_ids).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE r.exam_id = ", RESULT_SELECT));
        query.push_bind(exam_id);
        students.push_filter(&mut query, "r.student_id");
        query.push(" ORDER BY r.marks_obtained DESC, u.last_name, u.first_name");

        let results = query.build_query_as::<ExamResult>().fetch_all(db).await?;
        Ok(results)
    }

    /// Exams from today on for the given classes, soonest first.
    pub async fn upcoming_exams(
        db: &PgPool,
        class_ids: &[Uuid],
        limit: i64,
    ) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            r#"{} WHERE e.class_id = ANY($1) AND e.exam_date >= CURRENT_DATE
               ORDER BY e.exam_date, e.name LIMIT $2"#,
            EXAM_SELECT
        ))
        .bind(class_ids)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(exams)
    }

    pub async fn count_upcoming(db: &PgPool, class_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM exams WHERE class_id = $1 AND exam_date >= CURRENT_DATE",
        )
        .bind(class_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    fn push_result_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: &ResultFilterParams,
    ) {
        push_school_scope(qb, "e.school_id", scope);
        students.push_filter(qb, "r.student_id");

        if let Some(exam_id) = filters.exam_id {
            qb.push(" AND r.exam_id = ");
            qb.push_bind(exam_id);
        }
        if let Some(student_id) = filters.student_id {
            qb.push(" AND r.student_id = ");
            qb.push_bind(student_id);
        }
        if let Some(class_id) = filters.class_id {
            qb.push(" AND e.class_id = ");
            qb.push_bind(class_id);
        }
        if let Some(subject) = &filters.subject {
            qb.push(" AND e.subject ILIKE ");
            qb.push_bind(like_pattern(subject));
        }
    }

    /// Results across exams. Students get their own, parents their children's.
    #[instrument(skip(db, students, filters), fields(db.operation = "SELECT", db.table = "exam_results"))]
    pub async fn list_results(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: ResultFilterParams,
    ) -> Result<PaginatedResultsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM exam_results r JOIN exams e ON e.id = r.exam_id WHERE TRUE",
        );
        Self::push_result_filters(&mut count, scope, students, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", RESULT_SELECT));
        Self::push_result_filters(&mut query, scope, students, &filters);
        query.push(" ORDER BY e.exam_date DESC, u.last_name, u.first_name, r.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<ExamResult>().fetch_all(db).await?;

        Ok(PaginatedResultsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn entry(student_id: Uuid, marks: f64) -> ResultEntryDto {
        ResultEntryDto {
            student_id,
            marks_obtained: marks,
            remarks: None,
        }
    }

    #[test]
    fn test_check_entries_accepts_full_marks() {
        let entries = vec![entry(Uuid::new_v4(), 100.0), entry(Uuid::new_v4(), 0.0)];
        assert!(check_entries(&entries, 100).is_ok());
    }

    #[test]
    fn test_check_entries_rejects_marks_above_max() {
        let err = check_entries(&[entry(Uuid::new_v4(), 100.5)], 100).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("exceeds max_marks (100)"));
    }

    #[test]
    fn test_check_entries_rejects_duplicate_students() {
        let student = Uuid::new_v4();
        let err = check_entries(&[entry(student, 10.0), entry(student, 20.0)], 100).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_result_filters_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exam_results r WHERE TRUE");
        let filters = ResultFilterParams {
            subject: Some("math".to_string()),
            ..Default::default()
        };
        ExamService::push_result_filters(
            &mut qb,
            Some(Uuid::new_v4()),
            &StudentScope::Students(vec![Uuid::new_v4()]),
            &filters,
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM exam_results r WHERE TRUE AND e.school_id = $1 \
             AND r.student_id = ANY($2) AND e.subject ILIKE $3"
        );
    }
}
