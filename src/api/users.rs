use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{PublicProfile, UpdateProfileRequest, UserProfile};
use crate::services::user_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Own profile with premium status", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let profile = user_service::get_profile(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": profile
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid request")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let profile = user_service::update_profile(&db, &claims.user_id()?, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": profile
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = PublicProfile),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_public_profile(path: web::Path<String>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let user_id = parse_object_id(&path, "user")?;
    let profile = user_service::public_profile(&db, &user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": profile
    })))
}
