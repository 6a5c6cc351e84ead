use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{CheckoutRequest, ConfirmPaymentRequest, PaymentResponse};
use crate::services::payment_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

/// POST /api/v1/payments/checkout - Cria um pagamento pendente para o plano
#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    tag = "Payments",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Pending payment created", body = PaymentResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn checkout(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CheckoutRequest>,
) -> AppResult<HttpResponse> {
    let user_id = claims.user_id()?;
    log::info!("💳 POST /payments/checkout - user {} plan {:?}", user_id, request.plan);

    let payment = payment_service::checkout(&db, &user_id, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "payment": payment
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/confirm",
    tag = "Payments",
    params(("id" = String, Path, description = "Payment ID")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment settled", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is no longer pending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<ConfirmPaymentRequest>,
) -> AppResult<HttpResponse> {
    let payment_id = parse_object_id(&path, "payment")?;
    let user_id = claims.user_id()?;

    let payment = payment_service::confirm(&db, &user_id, &payment_id, &request).await?;
    log::info!("💳 Payment {} settled as {:?}", payment_id, payment.status);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "payment": payment
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/refund",
    tag = "Payments",
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment refunded", body = PaymentResponse),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Only succeeded payments can be refunded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn refund(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    claims.require_admin()?;
    let payment_id = parse_object_id(&path, "payment")?;
    log::warn!("↩️ Refund of payment {} by {}", payment_id, claims.sub);

    let payment = payment_service::refund(&db, &payment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "payment": payment
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    responses(
        (status = 200, description = "Payment history, newest first", body = [PaymentResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn history(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let payments = payment_service::history(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "payments": payments,
        "total": payments.len()
    })))
}

