use crate::config::JwtConfig;
use crate::models::Role;
use crate::services::auth_service::{self, TokenKind};
use crate::utils::validation::parse_object_id;
use crate::utils::{AppError, AppResult};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user ObjectId (hex)
    pub email: String,
    pub role: Role,
    pub token_type: TokenKind,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<ObjectId> {
        parse_object_id(&self.sub, "user")
            .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))
    }

    pub fn require_author(&self) -> AppResult<()> {
        if self.role.can_author() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Instructor or admin role required".into()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".into()))
        }
    }
}

/// Claims of the caller on scopes that let anonymous reads through.
pub fn require_user(claims: Option<web::ReqData<Claims>>) -> AppResult<Claims> {
    claims
        .map(|c| c.into_inner())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))
}

pub fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Verifies the bearer access token and stores its [`Claims`] in the request
/// extensions. With `public_reads`, GET/HEAD requests without a token pass
/// through anonymously.
pub struct AuthMiddleware {
    public_reads: bool,
}

impl AuthMiddleware {
    pub fn required() -> Self {
        Self { public_reads: false }
    }

    pub fn public_reads() -> Self {
        Self { public_reads: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            public_reads: self.public_reads,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    public_reads: bool,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_read = matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS);

        let token = match bearer_token(&req) {
            Some(token) => token,
            None if self.public_reads && is_read => {
                let fut = self.service.call(req);
                return Box::pin(fut);
            }
            None => {
                return Box::pin(async move {
                    Err(AppError::Unauthorized("Missing authorization token".into()).into())
                });
            }
        };

        let jwt = match req.app_data::<web::Data<JwtConfig>>() {
            Some(jwt) => jwt.clone(),
            None => {
                return Box::pin(async move {
                    Err(AppError::Internal("JWT configuration not registered".into()).into())
                });
            }
        };

        match auth_service::verify_token(&jwt, &token, TokenKind::Access) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(e) => {
                log::debug!("🔒 Rejected token on {}: {}", req.path(), e);
                Box::pin(async move { Err(AppError::Unauthorized("Invalid or expired token".into()).into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Premium, Streak, User};
    use actix_web::{http::StatusCode, test, App, HttpResponse};

    fn user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ada".into(),
            email: "ada@kodr.dev".into(),
            password_hash: String::new(),
            role,
            avatar: None,
            bio: None,
            xp: 0,
            streak: Streak::default(),
            premium: Premium::default(),
            is_active: true,
            is_deleted: false,
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        }
    }

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.sub.clone())
    }

    async fn maybe(claims: Option<web::ReqData<Claims>>) -> HttpResponse {
        HttpResponse::Ok().body(if claims.is_some() { "user" } else { "anonymous" })
    }

    #[actix_web::test]
    async fn rejects_missing_and_refresh_tokens() {
        let jwt = JwtConfig::default();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(jwt.clone()))
                .service(web::scope("/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let pair = auth_service::issue_tokens(&jwt, &user(Role::Student)).unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", pair.refresh_token)))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", pair.access_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn public_reads_let_anonymous_gets_through() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(JwtConfig::default())).service(
                web::scope("/courses")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(maybe))
                    .route("", web::post().to(maybe)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/courses").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "anonymous");

        let req = test::TestRequest::post().uri("/courses").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[::core::prelude::v1::test]
    fn role_guards() {
        let jwt = JwtConfig::default();
        let token = auth_service::issue_tokens(&jwt, &user(Role::Instructor)).unwrap().access_token;
        let claims = auth_service::verify_token(&jwt, &token, TokenKind::Access).unwrap();

        assert!(claims.require_author().is_ok());
        assert!(matches!(claims.require_admin(), Err(AppError::Forbidden(_))));
        assert!(claims.user_id().is_ok());
    }
}
