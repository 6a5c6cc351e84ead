use crate::{
    database::{MongoDB, PAYMENTS},
    models::{
        schedule_premium_periods, CheckoutRequest, ConfirmPaymentRequest, Payment, PaymentResponse, PaymentStatus,
        Premium,
    },
    services::user_service,
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::options::ReturnDocument;

pub async fn checkout(db: &MongoDB, user_id: &ObjectId, request: &CheckoutRequest) -> AppResult<PaymentResponse> {
    user_service::find_user(db, user_id).await?;

    let mut payment = Payment::pending(*user_id, request.plan, request.provider_reference.clone(), now_ts());
    let result = db.collection::<Payment>(PAYMENTS).insert_one(&payment).await?;
    payment.id = result.inserted_id.as_object_id();

    log::info!(
        "💳 Checkout started by {}: {:?} plan, {} {}",
        user_id,
        payment.plan,
        payment.amount_cents,
        payment.currency
    );
    Ok(PaymentResponse::from(payment))
}

/// Moves a pending payment of the caller to succeeded or failed.
pub async fn confirm(
    db: &MongoDB,
    user_id: &ObjectId,
    payment_id: &ObjectId,
    request: &ConfirmPaymentRequest,
) -> AppResult<PaymentResponse> {
    let collection = db.collection::<Payment>(PAYMENTS);
    let now = now_ts();

    let (status, paid_at) = if request.success {
        (PaymentStatus::Succeeded, Bson::Int64(now))
    } else {
        (PaymentStatus::Failed, Bson::Null)
    };
    let mut set = doc! { "status": status.as_str(), "paid_at": paid_at, "updated_at": now };
    if let Some(reference) = &request.provider_reference {
        set.insert("provider_reference", reference);
    }

    let updated = collection
        .find_one_and_update(
            doc! { "_id": payment_id, "user_id": user_id, "status": PaymentStatus::Pending.as_str() },
            doc! { "$set": set },
        )
        .return_document(ReturnDocument::After)
        .await?;

    if updated.is_none() {
        let exists = collection.find_one(doc! { "_id": payment_id, "user_id": user_id }).await?;
        return Err(match exists {
            Some(p) => AppError::Conflict(format!("Payment is already {}", p.status.as_str())),
            None => AppError::NotFound("Payment not found".into()),
        });
    }

    if request.success {
        let premium = recompute_premium(db, user_id).await?;
        log::info!("✅ Payment {} succeeded, premium until {:?}", payment_id, premium.expires_at);
    } else {
        log::warn!("⚠️ Payment {} failed for user {}", payment_id, user_id);
    }

    find_payment(db, payment_id).await.map(PaymentResponse::from)
}

/// Admin refund of a succeeded payment; premium shrinks accordingly.
pub async fn refund(db: &MongoDB, payment_id: &ObjectId) -> AppResult<PaymentResponse> {
    let collection = db.collection::<Payment>(PAYMENTS);

    let updated = collection
        .find_one_and_update(
            doc! { "_id": payment_id, "status": PaymentStatus::Succeeded.as_str() },
            doc! { "$set": { "status": PaymentStatus::Refunded.as_str(), "updated_at": now_ts() } },
        )
        .return_document(ReturnDocument::After)
        .await?;

    let payment = match updated {
        Some(payment) => payment,
        None => {
            let existing = find_payment(db, payment_id).await?;
            return Err(AppError::Conflict(format!(
                "Only succeeded payments can be refunded (payment is {})",
                existing.status.as_str()
            )));
        }
    };

    let premium = recompute_premium(db, &payment.user_id).await?;
    log::warn!(
        "↩️ Payment {} refunded, premium for {} now until {:?}",
        payment_id,
        payment.user_id,
        premium.expires_at
    );

    find_payment(db, payment_id).await.map(PaymentResponse::from)
}

pub async fn history(db: &MongoDB, user_id: &ObjectId) -> AppResult<Vec<PaymentResponse>> {
    let payments: Vec<Payment> = db
        .collection::<Payment>(PAYMENTS)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(payments.into_iter().map(PaymentResponse::from).collect())
}

async fn find_payment(db: &MongoDB, payment_id: &ObjectId) -> AppResult<Payment> {
    db.collection::<Payment>(PAYMENTS)
        .find_one(doc! { "_id": payment_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".into()))
}

/// Rebuilds premium periods from the user's payments and stores both the
/// per-payment periods and the resulting `user.premium`.
pub async fn recompute_premium(db: &MongoDB, user_id: &ObjectId) -> AppResult<Premium> {
    let collection = db.collection::<Payment>(PAYMENTS);
    let mut payments: Vec<Payment> = collection
        .find(doc! { "user_id": user_id })
        .await?
        .try_collect()
        .await?;

    let before: Vec<(Option<i64>, Option<i64>)> =
        payments.iter().map(|p| (p.period_start, p.period_end)).collect();
    let expiry = schedule_premium_periods(&mut payments);

    for (payment, old) in payments.iter().zip(before) {
        if (payment.period_start, payment.period_end) == old {
            continue;
        }
        collection
            .update_one(
                doc! { "_id": payment.id },
                doc! { "$set": { "period_start": payment.period_start, "period_end": payment.period_end } },
            )
            .await?;
    }

    let premium = Premium::until(expiry, now_ts());
    user_service::set_premium(db, user_id, &premium).await?;
    Ok(premium)
}
