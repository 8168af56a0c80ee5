use anyhow::anyhow;
use chrono::NaiveDate;
use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::fees::{
    CreateFeeDto, Fee, FeeDetails, FeeFilterParams, FeePayment, FeeStatus, FeeSummary,
    FeeSummaryParams, PaginatedFeesResponse, PaymentReceipt, RecordPaymentDto, UpdateFeeDto,
    validate_amount_change, validate_payment,
};
use scholaris_observability::track_payment_recorded;
use serde_json::json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{
    StudentScope, ensure_in_scope, ensure_student_in_school, push_school_scope,
};

const FEE_SELECT: &str = r#"SELECT f.id, f.school_id, f.student_id,
       CONCAT(u.first_name, ' ', u.last_name) AS student_name,
       f.title, f.description, f.amount_cents, f.paid_cents, f.due_date, f.paid_at,
       f.created_by, f.created_at, f.updated_at
FROM fees f
JOIN students s ON s.id = f.student_id
JOIN users u ON u.id = s.user_id"#;

const DEFAULT_PAYMENT_METHOD: &str = "cash";

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// SQL rendition of [`FeeStatus::derive`] against a bound `today`.
fn push_status_condition(qb: &mut QueryBuilder<'_, Postgres>, status: FeeStatus, today: NaiveDate) {
    match status {
        FeeStatus::Paid => {
            qb.push(" AND f.paid_cents >= f.amount_cents");
        }
        FeeStatus::Overdue => {
            qb.push(" AND f.paid_cents < f.amount_cents AND f.due_date < ");
            qb.push_bind(today);
        }
        FeeStatus::Partial => {
            qb.push(" AND f.paid_cents > 0 AND f.paid_cents < f.amount_cents AND f.due_date >= ");
            qb.push_bind(today);
        }
        FeeStatus::Pending => {
            qb.push(" AND f.paid_cents = 0 AND f.due_date >= ");
            qb.push_bind(today);
        }
    }
}

async fn fetch_fee<'e, E>(executor: E, id: Uuid) -> Result<Option<Fee>, AppError>
where
    E: PgExecutor<'e>,
{
    let fee = sqlx::query_as::<_, Fee>(&format!("{} WHERE f.id = $1", FEE_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(fee.map(|f| f.with_status(today())))
}

pub struct FeeService;

impl FeeService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "fees"))]
    pub async fn create_fee(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateFeeDto,
    ) -> Result<Fee, AppError> {
        ensure_student_in_school(db, dto.student_id, school_id).await?;

        let mut tx = db.begin().await?;

        let fee_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO fees (school_id, student_id, title, description, amount_cents,
                                 due_date, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(school_id)
        .bind(dto.student_id)
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.amount_cents)
        .bind(dto.due_date)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "fee", Some(fee_id))
                .details(json!({
                    "student_id": dto.student_id,
                    "title": dto.title,
                    "amount_cents": dto.amount_cents,
                })),
        )
        .await?;

        let fee = fetch_fee(&mut *tx, fee_id)
            .await?
            .ok_or_else(|| AppError::internal_error("Fee vanished after insert".to_string()))?;

        tx.commit().await?;
        Ok(fee)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: &FeeFilterParams,
        today: NaiveDate,
    ) {
        push_school_scope(qb, "f.school_id", scope);
        students.push_filter(qb, "f.student_id");

        if let Some(student_id) = filters.student_id {
            qb.push(" AND f.student_id = ");
            qb.push_bind(student_id);
        }
        if let Some(status) = filters.status {
            push_status_condition(qb, status, today);
        }
        if let Some(from) = filters.due_from {
            qb.push(" AND f.due_date >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filters.due_to {
            qb.push(" AND f.due_date <= ");
            qb.push_bind(to);
        }
    }

    #[instrument(skip(db, students, filters), fields(db.operation = "SELECT", db.table = "fees"))]
    pub async fn list_fees(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        filters: FeeFilterParams,
    ) -> Result<PaginatedFeesResponse, AppError> {
        let today = today();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM fees f WHERE TRUE");
        Self::push_filters(&mut count, scope, students, &filters, today);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", FEE_SELECT));
        Self::push_filters(&mut query, scope, students, &filters, today);
        query.push(" ORDER BY f.due_date, f.created_at, f.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query
            .build_query_as::<Fee>()
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|fee| fee.with_status(today))
            .collect();

        Ok(PaginatedFeesResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db, students), fields(db.operation = "SELECT", db.table = "fees"))]
    pub async fn get_fee(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        students: &StudentScope,
    ) -> Result<Fee, AppError> {
        let fee = fetch_fee(db, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))?;

        ensure_in_scope(scope, fee.school_id, "Fee")?;
        students.ensure_allows(fee.student_id, "Fee")?;
        Ok(fee)
    }

    /// The fee together with its payments, oldest first.
    pub async fn get_fee_details(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        students: &StudentScope,
    ) -> Result<FeeDetails, AppError> {
        let fee = Self::get_fee(db, id, scope, students).await?;
        let payments = sqlx::query_as::<_, FeePayment>(
            r#"SELECT id, fee_id, amount_cents, method, reference, recorded_by, paid_at
               FROM fee_payments
               WHERE fee_id = $1
               ORDER BY paid_at, id"#,
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(FeeDetails { fee, payments })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "fees"))]
    pub async fn update_fee(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateFeeDto,
    ) -> Result<Fee, AppError> {
        let existing = Self::get_fee(db, id, scope, &StudentScope::Unrestricted).await?;

        let mut tx = db.begin().await?;

        // Payments lock the same row, so the paid amount can't move under us.
        let paid_cents =
            sqlx::query_scalar::<_, i64>("SELECT paid_cents FROM fees WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))?;

        if let Some(amount) = dto.amount_cents {
            validate_amount_change(amount, paid_cents)
                .map_err(|msg| AppError::bad_request(anyhow!(msg)))?;
        }

        sqlx::query(
            r#"UPDATE fees
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   amount_cents = COALESCE($4, amount_cents),
                   due_date = COALESCE($5, due_date),
                   paid_at = CASE
                       WHEN paid_cents >= COALESCE($4, amount_cents) THEN COALESCE(paid_at, NOW())
                       ELSE NULL
                   END,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.amount_cents)
        .bind(dto.due_date)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "fee", Some(id))
                .details(json!({
                    "amount_cents": dto.amount_cents,
                    "due_date": dto.due_date,
                })),
        )
        .await?;

        let fee = fetch_fee(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))?;

        tx.commit().await?;
        Ok(fee)
    }

    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "fees"))]
    pub async fn delete_fee(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_fee(db, id, scope, &StudentScope::Unrestricted).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM fees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "fee", Some(id))
                .details(json!({
                    "student_id": existing.student_id,
                    "title": existing.title,
                    "paid_cents": existing.paid_cents,
                })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Records a payment against the outstanding balance. The fee row is
    /// locked for the duration so concurrent payments cannot overshoot.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "fee_payments"))]
    pub async fn record_payment(
        db: &PgPool,
        actor_id: Uuid,
        fee_id: Uuid,
        scope: Option<Uuid>,
        dto: RecordPaymentDto,
    ) -> Result<PaymentReceipt, AppError> {
        let mut tx = db.begin().await?;

        let (school_id, amount_cents, paid_cents) = sqlx::query_as::<_, (Uuid, i64, i64)>(
            "SELECT school_id, amount_cents, paid_cents FROM fees WHERE id = $1 FOR UPDATE",
        )
        .bind(fee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))?;

        ensure_in_scope(scope, school_id, "Fee")?;
        validate_payment(amount_cents, paid_cents, dto.amount_cents)
            .map_err(|msg| AppError::bad_request(anyhow!(msg)))?;

        let method = dto
            .method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD);

        let payment = sqlx::query_as::<_, FeePayment>(
            r#"INSERT INTO fee_payments (fee_id, amount_cents, method, reference, recorded_by)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, fee_id, amount_cents, method, reference, recorded_by, paid_at"#,
        )
        .bind(fee_id)
        .bind(dto.amount_cents)
        .bind(method)
        .bind(&dto.reference)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE fees
               SET paid_cents = paid_cents + $2,
                   paid_at = CASE WHEN paid_cents + $2 >= amount_cents THEN NOW() ELSE paid_at END,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(fee_id)
        .bind(dto.amount_cents)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Payment, "fee", Some(fee_id))
                .details(json!({
                    "payment_id": payment.id,
                    "amount_cents": dto.amount_cents,
                    "method": method,
                })),
        )
        .await?;

        let fee = fetch_fee(&mut *tx, fee_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))?;

        tx.commit().await?;

        track_payment_recorded(dto.amount_cents);
        Ok(PaymentReceipt { fee, payment })
    }

    /// Outstanding balance and number of unpaid fees of one student.
    pub async fn outstanding_for_student(
        db: &PgPool,
        student_id: Uuid,
    ) -> Result<(i64, i64), AppError> {
        let outstanding = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COALESCE(SUM(amount_cents - paid_cents), 0)::BIGINT,
                      COUNT(*) FILTER (WHERE paid_cents < amount_cents)
               FROM fees
               WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_one(db)
        .await?;
        Ok(outstanding)
    }

    /// Billed, collected and outstanding totals with a count per status.
    #[instrument(skip(db, students, params), fields(db.operation = "SELECT", db.table = "fees"))]
    pub async fn summary(
        db: &PgPool,
        scope: Option<Uuid>,
        students: &StudentScope,
        params: FeeSummaryParams,
    ) -> Result<FeeSummary, AppError> {
        let today = today();

        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT COUNT(*) AS total_fees,
                      COALESCE(SUM(f.amount_cents), 0)::BIGINT AS total_billed_cents,
                      COALESCE(SUM(f.paid_cents), 0)::BIGINT AS total_collected_cents,
                      COALESCE(SUM(f.amount_cents - f.paid_cents), 0)::BIGINT AS total_outstanding_cents,
                      COUNT(*) FILTER (WHERE f.paid_cents >= f.amount_cents) AS paid_count,
                      COUNT(*) FILTER (WHERE f.paid_cents > 0 AND f.paid_cents < f.amount_cents AND f.due_date >= "#,
        );
        query.push_bind(today);
        query.push(") AS partial_count, COUNT(*) FILTER (WHERE f.paid_cents = 0 AND f.due_date >= ");
        query.push_bind(today);
        query.push(") AS pending_count, COUNT(*) FILTER (WHERE f.paid_cents < f.amount_cents AND f.due_date < ");
        query.push_bind(today);
        query.push(") AS overdue_count FROM fees f WHERE TRUE");

        push_school_scope(&mut query, "f.school_id", scope);
        students.push_filter(&mut query, "f.student_id");
        if let Some(student_id) = params.student_id {
            query.push(" AND f.student_id = ");
            query.push_bind(student_id);
        }

        let summary = query.build_query_as::<FeeSummary>().fetch_one(db).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(status: FeeStatus) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM fees f WHERE TRUE");
        push_status_condition(&mut qb, status, today());
        qb.sql().to_string()
    }

    #[test]
    fn test_status_conditions() {
        assert_eq!(
            sql_for(FeeStatus::Paid),
            "SELECT 1 FROM fees f WHERE TRUE AND f.paid_cents >= f.amount_cents"
        );
        assert_eq!(
            sql_for(FeeStatus::Overdue),
            "SELECT 1 FROM fees f WHERE TRUE AND f.paid_cents < f.amount_cents AND f.due_date < $1"
        );
        assert!(sql_for(FeeStatus::Pending).contains("f.paid_cents = 0 AND f.due_date >= $1"));
        assert!(sql_for(FeeStatus::Partial).contains("f.paid_cents > 0"));
    }

    #[test]
    fn test_filters_scope_restricted_students() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM fees f WHERE TRUE");
        let filters = FeeFilterParams {
            status: Some(FeeStatus::Paid),
            ..Default::default()
        };
        FeeService::push_filters(
            &mut qb,
            Some(Uuid::new_v4()),
            &StudentScope::Students(vec![Uuid::new_v4()]),
            &filters,
            today(),
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM fees f WHERE TRUE AND f.school_id = $1 \
             AND f.student_id = ANY($2) AND f.paid_cents >= f.amount_cents"
        );
    }
}
