//! Fee billing and payment models.
//!
//! Amounts are integer cents. A fee's status is not stored; it is derived
//! from the paid amount and the due date every time the fee is read.

use scholaris_core::serde::deserialize_optional_uuid;
use scholaris_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl FeeStatus {
    /// PAID once fully paid; OVERDUE when still owing after the due date;
    /// otherwise PARTIAL or PENDING depending on whether anything was paid.
    pub fn derive(
        amount_cents: i64,
        paid_cents: i64,
        due_date: chrono::NaiveDate,
        today: chrono::NaiveDate,
    ) -> Self {
        if paid_cents >= amount_cents {
            FeeStatus::Paid
        } else if today > due_date {
            FeeStatus::Overdue
        } else if paid_cents > 0 {
            FeeStatus::Partial
        } else {
            FeeStatus::Pending
        }
    }
}

/// Checks a payment against the outstanding balance.
pub fn validate_payment(amount_cents: i64, paid_cents: i64, payment_cents: i64) -> Result<(), String> {
    if payment_cents <= 0 {
        return Err("Payment amount must be greater than zero".to_string());
    }
    let outstanding = amount_cents - paid_cents;
    if outstanding <= 0 {
        return Err("Fee is already fully paid".to_string());
    }
    if payment_cents > outstanding {
        return Err(format!(
            "Payment of {} exceeds outstanding balance of {}",
            payment_cents, outstanding
        ));
    }
    Ok(())
}

/// A fee can't be re-billed below what has already been collected.
pub fn validate_amount_change(new_amount_cents: i64, paid_cents: i64) -> Result<(), String> {
    if new_amount_cents < paid_cents {
        return Err(format!(
            "amount_cents cannot be lower than the {} already paid",
            paid_cents
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fee {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    #[schema(example = "First term tuition")]
    pub title: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub due_date: chrono::NaiveDate,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[sqlx(skip)]
    pub status: FeeStatus,
    #[sqlx(skip)]
    pub balance_cents: i64,
}

impl Fee {
    /// Fills in `status` and `balance_cents` as of `today`.
    pub fn with_status(mut self, today: chrono::NaiveDate) -> Self {
        self.status = FeeStatus::derive(self.amount_cents, self.paid_cents, self.due_date, today);
        self.balance_cents = (self.amount_cents - self.paid_cents).max(0);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeePayment {
    pub id: Uuid,
    pub fee_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub reference: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub paid_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFeeDto {
    /// Must be a student of the requester's school
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    pub due_date: chrono::NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFeeDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    /// Cannot drop below what has already been paid
    #[validate(range(min = 1))]
    pub amount_cents: Option<i64>,
    pub due_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentDto {
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    #[validate(length(min = 1, max = 30))]
    #[schema(example = "bank_transfer")]
    pub method: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub fee: Fee,
    pub payment: FeePayment,
}

/// Fee with its payment history, returned by `GET /api/fees/{id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeeDetails {
    #[serde(flatten)]
    pub fee: Fee,
    pub payments: Vec<FeePayment>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub status: Option<FeeStatus>,
    pub due_from: Option<chrono::NaiveDate>,
    pub due_to: Option<chrono::NaiveDate>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedFeesResponse {
    pub data: Vec<Fee>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeeSummary {
    pub total_fees: i64,
    pub total_billed_cents: i64,
    pub total_collected_cents: i64,
    pub total_outstanding_cents: i64,
    pub paid_count: i64,
    pub partial_count: i64,
    pub pending_count: i64,
    pub overdue_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeSummaryParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    /// Super admins only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
}
