use crate::utils::validation::{optional_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn duration_days(&self) -> i64 {
        match self {
            Plan::Monthly => 30,
            Plan::Yearly => 365,
        }
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration_days() * DAY_SECS
    }

    pub fn price_cents(&self) -> i64 {
        match self {
            Plan::Monthly => 999,
            Plan::Yearly => 9_999,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Registro de pagamento que libera o acesso premium
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub plan: Plan,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,
    pub updated_at: i64,
}

impl Payment {
    pub fn pending(user_id: ObjectId, plan: Plan, provider_reference: Option<String>, now: i64) -> Self {
        Payment {
            id: None,
            user_id,
            plan,
            amount_cents: plan.price_cents(),
            currency: "usd".to_string(),
            status: PaymentStatus::Pending,
            provider: "checkout".to_string(),
            provider_reference,
            created_at: now,
            paid_at: None,
            period_start: None,
            period_end: None,
            updated_at: now,
        }
    }
}

/// Lays out premium periods back to back for succeeded payments, in
/// `paid_at` order, and returns the resulting premium expiry.
///
/// A payment made while premium is still running extends it from the current
/// expiry; one made after a lapse starts at its `paid_at`. Payments that are
/// not succeeded get their period cleared.
pub fn schedule_premium_periods(payments: &mut [Payment]) -> Option<i64> {
    let mut order: Vec<usize> = (0..payments.len()).collect();
    order.sort_by_key(|&i| (payments[i].paid_at.unwrap_or(payments[i].created_at), payments[i].created_at));

    let mut expiry: Option<i64> = None;
    for i in order {
        let payment = &mut payments[i];
        if payment.status != PaymentStatus::Succeeded {
            payment.period_start = None;
            payment.period_end = None;
            continue;
        }

        let paid_at = payment.paid_at.unwrap_or(payment.created_at);
        let start = expiry.map(|exp| exp.max(paid_at)).unwrap_or(paid_at);
        let end = start + payment.plan.duration_secs();

        payment.period_start = Some(start);
        payment.period_end = Some(end);
        expiry = Some(end);
    }

    expiry
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CheckoutRequest {
    pub plan: Plan,
    pub provider_reference: Option<String>,
}

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.provider_reference.as_deref(), "provider_reference", 200)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ConfirmPaymentRequest {
    pub success: bool,
    pub provider_reference: Option<String>,
}

impl Validate for ConfirmPaymentRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.provider_reference.as_deref(), "provider_reference", 200)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaymentResponse {
    pub id: String,
    pub user_id: String,
    pub plan: Plan,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        PaymentResponse {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: p.user_id.to_hex(),
            plan: p.plan,
            amount_cents: p.amount_cents,
            currency: p.currency,
            status: p.status,
            provider: p.provider,
            provider_reference: p.provider_reference,
            created_at: p.created_at,
            paid_at: p.paid_at,
            period_start: p.period_start,
            period_end: p.period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid(plan: Plan, at: i64) -> Payment {
        let mut p = Payment::pending(ObjectId::new(), plan, None, at);
        p.status = PaymentStatus::Succeeded;
        p.paid_at = Some(at);
        p
    }

    #[test]
    fn plans_are_priced() {
        let p = Payment::pending(ObjectId::new(), Plan::Yearly, None, 0);
        assert_eq!(p.amount_cents, 9_999);
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(Plan::Monthly.duration_secs(), 30 * 86_400);
    }

    #[test]
    fn no_succeeded_payments_no_premium() {
        let mut payments = vec![Payment::pending(ObjectId::new(), Plan::Monthly, None, 0)];
        assert_eq!(schedule_premium_periods(&mut payments), None);
        assert_eq!(payments[0].period_end, None);
    }

    #[test]
    fn renewal_during_active_period_stacks() {
        let month = Plan::Monthly.duration_secs();
        let mut payments = vec![paid(Plan::Monthly, 10 * 86_400), paid(Plan::Monthly, 0)];

        let expiry = schedule_premium_periods(&mut payments);
        assert_eq!(expiry, Some(2 * month));
        // ordered by paid_at, not by position
        assert_eq!(payments[1].period_start, Some(0));
        assert_eq!(payments[0].period_start, Some(month));
    }

    #[test]
    fn payment_after_lapse_starts_fresh() {
        let month = Plan::Monthly.duration_secs();
        let late = month + 5 * 86_400;
        let mut payments = vec![paid(Plan::Monthly, 0), paid(Plan::Yearly, late)];

        let expiry = schedule_premium_periods(&mut payments);
        assert_eq!(payments[1].period_start, Some(late));
        assert_eq!(expiry, Some(late + Plan::Yearly.duration_secs()));
    }

    #[test]
    fn refund_shortens_premium() {
        let month = Plan::Monthly.duration_secs();
        let mut payments = vec![paid(Plan::Monthly, 0), paid(Plan::Monthly, 100)];
        assert_eq!(schedule_premium_periods(&mut payments), Some(2 * month));

        payments[0].status = PaymentStatus::Refunded;
        assert_eq!(schedule_premium_periods(&mut payments), Some(100 + month));
        assert_eq!(payments[0].period_start, None);
    }
}
