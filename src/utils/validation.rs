use crate::utils::error::AppError;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Request payloads that check their own invariants before reaching a handler.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// JSON body extractor that runs [`Validate::validate`] and rejects with 400.
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
{
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let json = web::Json::<T>::from_request(req, payload);

        Box::pin(async move {
            let body = json
                .await
                .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?
                .into_inner();
            body.validate()?;
            Ok(ValidatedJson(body))
        })
    }
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid {} ID", what)))
}

pub fn require_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

pub fn optional_text(value: Option<&str>, field: &str, max_len: usize) -> Result<(), AppError> {
    match value {
        Some(v) => require_text(v, field, max_len),
        None => Ok(()),
    }
}

pub fn require_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if valid && email.len() <= 254 {
        Ok(())
    } else {
        Err(AppError::Validation("A valid email is required".into()))
    }
}

pub fn require_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if password.len() > 72 {
        // bcrypt only looks at the first 72 bytes
        return Err(AppError::Validation("Password is too long".into()));
    }
    Ok(())
}

pub fn optional_url(value: Option<&str>, field: &str) -> Result<(), AppError> {
    match value {
        Some(url) if !(url.starts_with("https://") || url.starts_with("http://")) => Err(
            AppError::Validation(format!("{} must be an http(s) URL", field)),
        ),
        Some(url) if url.len() > 2048 => {
            Err(AppError::Validation(format!("{} is too long", field)))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct NamePayload {
        name: String,
    }

    impl Validate for NamePayload {
        fn validate(&self) -> Result<(), AppError> {
            require_text(&self.name, "Name", 10)
        }
    }

    async fn echo(body: ValidatedJson<NamePayload>) -> HttpResponse {
        HttpResponse::Ok().body(body.name.clone())
    }

    #[::core::prelude::v1::test]
    fn email_shapes() {
        assert!(require_email("ada@kodr.dev").is_ok());
        assert!(require_email("ada@kodr").is_err());
        assert!(require_email("@kodr.dev").is_err());
        assert!(require_email("ada lovelace@kodr.dev").is_err());
        assert!(require_email("ada@@kodr.dev").is_err());
    }

    #[::core::prelude::v1::test]
    fn text_bounds() {
        assert!(require_text("  ", "Title", 5).is_err());
        assert!(require_text("abcdef", "Title", 5).is_err());
        assert!(require_text(" abc ", "Title", 5).is_ok());
        assert!(optional_text(None, "Bio", 5).is_ok());
    }

    #[::core::prelude::v1::test]
    fn urls_and_ids() {
        assert!(optional_url(Some("https://github.com/kodr"), "repo_url").is_ok());
        assert!(optional_url(Some("ftp://example.com"), "repo_url").is_err());
        assert!(parse_object_id("not-an-id", "course").is_err());
        assert!(parse_object_id("65f1c0ffee0000000000abcd", "course").is_ok());
    }

    #[actix_web::test]
    async fn rejects_invalid_body_before_handler() {
        let app = test::init_service(App::new().route("/", actix_web::web::post().to(echo))).await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_json(serde_json::json!({ "name": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/")
            .set_json(serde_json::json!({ "name": "kodr" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
