use actix_web::{web, HttpResponse};
use crate::config::JwtConfig;
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::UserProfile;
use crate::services::{auth_service, user_service};
use crate::services::auth_service::{AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::utils::validation::ValidatedJson;
use crate::utils::AppResult;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    jwt: web::Data<JwtConfig>,
    request: ValidatedJson<RegisterRequest>,
) -> AppResult<HttpResponse> {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    let response = auth_service::register(&db, &jwt, &request).await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deleted or inactive")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    jwt: web::Data<JwtConfig>,
    request: ValidatedJson<LoginRequest>,
) -> AppResult<HttpResponse> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    db: web::Data<MongoDB>,
    jwt: web::Data<JwtConfig>,
    request: ValidatedJson<RefreshTokenRequest>,
) -> AppResult<HttpResponse> {
    log::info!("🔄 POST /auth/refresh");

    let response = auth_service::refresh_token(&db, &jwt, &request).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let user = user_service::get_profile(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": user
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/account",
    tag = "Auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    log::info!("🗑️ DELETE /auth/account - user: {}", claims.sub);

    auth_service::delete_account(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Account deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::AuthMiddleware;
    use actix_web::{http::StatusCode, test, App};

    async fn accept(_body: ValidatedJson<RegisterRequest>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn register_body_is_validated() {
        let app = test::init_service(App::new().route("/register", web::post().to(accept))).await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(serde_json::json!({ "name": "Ada", "email": "not-an-email", "password": "longenough" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn me_requires_token() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(JwtConfig::default())).service(
                web::scope("/auth")
                    .wrap(AuthMiddleware::required())
                    .route("/me", web::get().to(get_me)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/auth/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
