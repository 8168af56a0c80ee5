use std::collections::HashSet;

use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::attendance::{
    AttendanceCounts, AttendanceEntryDto, AttendanceFilterParams, AttendanceRecord,
    AttendanceSummary, AttendanceSummaryParams, MarkAttendanceDto, MarkAttendanceResponse,
    PaginatedAttendanceResponse, UpdateAttendanceDto,
};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_observability::track_attendance_marked;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{
    StudentScope, ensure_class_in_school, ensure_in_scope, push_school_scope,
};

const RECORD_SELECT: &str = r#"SELECT a.id, a.school_id, a.student_id,
       CONCAT(u.first_name, ' ', u.last_name) AS student_name,
       a.class_id, a.attendance_date, a.status, a.remarks, a.recorded_by,
       a.created_at, a.updated_at
FROM attendance_records a
JOIN students s ON s.id = a.student_id
JOIN users u ON u.id = s.user_id"#;

fn check_entries(
    entries: &[AttendanceEntryDto],
    date: chrono::NaiveDate,
    today: chrono::NaiveDate,
) -> Result<(), AppError> {
    if date > today {
        return Err(AppError::bad_request(anyhow!(
            "Attendance cannot be marked for a future date"
        )));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    if let Some(dup) = entries.iter().find(|e| !seen.insert(e.student_id)) {
        return Err(AppError::bad_request(anyhow!(
            "Student {} appears more than once",
            dup.student_id
        )));
    }
    Ok(())
}

pub struct AttendanceService;

impl AttendanceService {
    /// Marks a class for one day. Re-marking a student on the same date
    /// overwrites the earlier entry.
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "UPSERT", db.table = "attendance_records"))]
    pub async fn mark_attendance(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: MarkAttendanceDto,
    ) -> Result<MarkAttendanceResponse, AppError> {
        check_entries(&dto.entries, dto.date, chrono::Utc::now().date_naive())?;
        ensure_class_in_school(db, dto.class_id, school_id).await?;

        let student_ids: Vec<Uuid> = dto.entries.iter().map(|e| e.student_id).collect();
        let enrolled = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM students WHERE id = ANY($1) AND class_id = $2",
        )
        .bind(&student_ids)
        .bind(dto.class_id)
        .fetch_all(db)
        .await?;

        if let Some(missing) = student_ids.iter().find(|id| !enrolled.contains(id)) {
            return Err(AppError::bad_request(anyhow!(
                "Student {} is not enrolled in this class",
                missing
            )));
        }

        let mut tx = db.begin().await?;

        for entry in &dto.entries {
            sqlx::query(
                r#"INSERT INTO attendance_records (school_id, student_id, class_id, attendance_date,
                                                   status, remarks, recorded_by)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                   ON CONFLICT (student_id, attendance_date) DO UPDATE
                   SET class_id = EXCLUDED.class_id,
                       status = EXCLUDED.status,
                       remarks = EXCLUDED.remarks,
                       recorded_by = EXCLUDED.recorded_by,
                       updated_at = NOW()"#,
            )
            .bind(school_id)
            .bind(entry.student_id)
            .bind(dto.class_id)
            .bind(dto.date)
            .bind(entry.status)
            .bind(&entry.remarks)
            .bind(actor_id)
            .execute(&mut *tx)
            .await?;
        }

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "attendance", None)
                .details(json!({
                    "class_id": dto.class_id,
                    "date": dto.date,
                    "marked": dto.entries.len(),
                })),
        )
        .await?;

        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "{} WHERE a.attendance_date = $1 AND a.student_id = ANY($2) ORDER BY u.last_name, u.first_name",
            RECORD_SELECT
        ))
        .bind(dto.date)
        .bind(&student_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        track_attendance_marked(records.len());
        Ok(MarkAttendanceResponse {
            class_id: dto.class_id,
            date: dto.date,
            marked: records.len(),
            records,
        })
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: &AttendanceFilterParams,
    ) {
        push_school_scope(qb, "a.school_id", scope);
        students.push_filter(qb, "a.student_id");

        if let Some(class_id) = filters.class_id {
            qb.push(" AND a.class_id = ");
            qb.push_bind(class_id);
        }
        if let Some(student_id) = filters.student_id {
            qb.push(" AND a.student_id = ");
            qb.push_bind(student_id);
        }
        if let Some(status) = filters.status {
            qb.push(" AND a.status = ");
            qb.push_bind(status);
        }
        if let Some(from) = filters.date_from {
            qb.push(" AND a.attendance_date >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filters.date_to {
            qb.push(" AND a.attendance_date <= ");
            qb.push_bind(to);
        }
    }

    #[instrument(skip(db, students, filters), fields(db.operation = "SELECT", db.table = "attendance_records"))]
    pub async fn list_attendance(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: AttendanceFilterParams,
    ) -> Result<PaginatedAttendanceResponse, AppError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM attendance_records a WHERE TRUE");
        Self::push_filters(&mut count, scope, students, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", RECORD_SELECT));
        Self::push_filters(&mut query, scope, students, &filters);
        query.push(" ORDER BY a.attendance_date DESC, u.last_name, u.first_name, a.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<AttendanceRecord>().fetch_all(db).await?;

        Ok(PaginatedAttendanceResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    async fn get_record(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<AttendanceRecord, AppError> {
        let record =
            sqlx::query_as::<_, AttendanceRecord>(&format!("{} WHERE a.id = $1", RECORD_SELECT))
                .bind(id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Attendance record not found")))?;

        ensure_in_scope(scope, record.school_id, "Attendance record")?;
        Ok(record)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "attendance_records"))]
    pub async fn update_attendance(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateAttendanceDto,
    ) -> Result<AttendanceRecord, AppError> {
        let existing = Self::get_record(db, id, scope).await?;

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE attendance_records
               SET status = COALESCE($2, status),
                   remarks = COALESCE($3, remarks),
                   recorded_by = $4,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.status)
        .bind(&dto.remarks)
        .bind(actor_id)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "attendance", Some(id))
                .details(json!({ "from": existing.status, "to": dto.status })),
        )
        .await?;

        let record =
            sqlx::query_as::<_, AttendanceRecord>(&format!("{} WHERE a.id = $1", RECORD_SELECT))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(record)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "attendance_records"))]
    pub async fn delete_attendance(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_record(db, id, scope).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "attendance", Some(id))
                .details(json!({
                    "student_id": existing.student_id,
                    "date": existing.attendance_date,
                })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Per-status counts and the attendance rate over the matching records.
    #[instrument(skip(db, students, params), fields(db.operation = "SELECT", db.table = "attendance_records"))]
    pub async fn summary(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        params: AttendanceSummaryParams,
    ) -> Result<AttendanceSummary, AppError> {
        if let Some(student_id) = params.student_id {
            students.ensure_allows(student_id, "Student")?;
        }

        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT COUNT(*) FILTER (WHERE a.status = 'PRESENT') AS present,
                      COUNT(*) FILTER (WHERE a.status = 'ABSENT') AS absent,
                      COUNT(*) FILTER (WHERE a.status = 'LATE') AS late,
                      COUNT(*) FILTER (WHERE a.status = 'EXCUSED') AS excused
               FROM attendance_records a
               WHERE TRUE"#,
        );
        push_school_scope(&mut query, "a.school_id", scope);
        students.push_filter(&mut query, "a.student_id");

        if let Some(student_id) = params.student_id {
            query.push(" AND a.student_id = ");
            query.push_bind(student_id);
        }
        if let Some(class_id) = params.class_id {
            query.push(" AND a.class_id = ");
            query.push_bind(class_id);
        }
        if let Some(from) = params.date_from {
            query.push(" AND a.attendance_date >= ");
            query.push_bind(from);
        }
        if let Some(to) = params.date_to {
            query.push(" AND a.attendance_date <= ");
            query.push_bind(to);
        }

        let counts = query.build_query_as::<AttendanceCounts>().fetch_one(db).await?;
        Ok(AttendanceSummary::from_counts(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use scholaris_models::attendance::AttendanceStatus;

    fn entry(student_id: Uuid) -> AttendanceEntryDto {
        AttendanceEntryDto {
            student_id,
            status: AttendanceStatus::Present,
            remarks: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[test]
    fn test_check_entries_accepts_today_and_past() {
        let entries = vec![entry(Uuid::new_v4()), entry(Uuid::new_v4())];
        assert!(check_entries(&entries, day(3), day(3)).is_ok());
        assert!(check_entries(&entries, day(1), day(3)).is_ok());
    }

    #[test]
    fn test_check_entries_rejects_future_date() {
        let err = check_entries(&[entry(Uuid::new_v4())], day(4), day(3)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_check_entries_rejects_duplicates() {
        let student = Uuid::new_v4();
        let err = check_entries(&[entry(student), entry(student)], day(3), day(3)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("more than once"));
    }
}
