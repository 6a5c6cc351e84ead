use crate::{
    config::JwtConfig,
    database::{MongoDB, USERS},
    middleware::auth::Claims,
    models::{Premium, Role, Streak, User, UserProfile},
    utils::time::now_ts,
    utils::validation::{require_email, require_password, require_text, Validate},
    utils::{AppError, AppResult},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.name, "Name", 80)?;
        require_email(&self.email)?;
        require_password(&self.password)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl Validate for RefreshTokenRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.refresh_token, "refresh_token", 4096)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

fn issue(jwt: &JwtConfig, user: &User, kind: TokenKind, ttl: Duration) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id_hex(),
        email: user.email.clone(),
        role: user.role,
        token_type: kind,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )?)
}

pub fn issue_tokens(jwt: &JwtConfig, user: &User) -> AppResult<TokenPair> {
    if user.id.is_none() {
        return Err(AppError::Internal("Cannot issue tokens for unsaved user".into()));
    }
    let access_ttl = Duration::hours(jwt.access_ttl_hours);
    Ok(TokenPair {
        access_token: issue(jwt, user, TokenKind::Access, access_ttl)?,
        refresh_token: issue(jwt, user, TokenKind::Refresh, Duration::days(jwt.refresh_ttl_days))?,
        expires_in: access_ttl.num_seconds(),
    })
}

/// Decodes and checks signature, expiry, issuer, audience and token kind.
pub fn verify_token(jwt: &JwtConfig, token: &str, expected: TokenKind) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);
    validation.set_issuer(&[jwt.issuer.as_str()]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )?
    .claims;

    if claims.token_type != expected {
        return Err(AppError::Unauthorized("Wrong token type".into()));
    }
    Ok(claims)
}

pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn auth_response(jwt: &JwtConfig, user: User) -> AppResult<AuthResponse> {
    let tokens = issue_tokens(jwt, &user)?;
    Ok(AuthResponse {
        success: true,
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserProfile::from_user(user, now_ts()),
    })
}

fn ensure_can_sign_in(user: &User) -> AppResult<()> {
    if user.is_deleted {
        return Err(AppError::Forbidden("Account has been deleted".into()));
    }
    if !user.is_active {
        return Err(AppError::Forbidden("Account is inactive".into()));
    }
    Ok(())
}

pub async fn register(db: &MongoDB, jwt: &JwtConfig, request: &RegisterRequest) -> AppResult<AuthResponse> {
    let collection = db.collection::<User>(USERS);
    let email = normalize_email(&request.email);

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let now = now_ts();
    let mut user = User {
        id: None,
        name: request.name.trim().to_string(),
        email: email.clone(),
        password_hash: hash_password(request.password.clone()).await?,
        role: Role::Student,
        avatar: None,
        bio: None,
        xp: 0,
        streak: Streak::default(),
        premium: Premium::default(),
        is_active: true,
        is_deleted: false,
        deleted_at: None,
        created_at: now,
        updated_at: now,
        last_login: Some(now),
    };

    // The unique index on email catches concurrent registrations
    let result = collection
        .insert_one(&user)
        .await
        .map_err(|e| AppError::on_duplicate(e, "Email is already registered"))?;
    user.id = result.inserted_id.as_object_id();

    log::info!("✅ User registered: {}", email);

    auth_response(jwt, user)
}

pub async fn login(db: &MongoDB, jwt: &JwtConfig, request: &LoginRequest) -> AppResult<AuthResponse> {
    let collection = db.collection::<User>(USERS);
    let email = normalize_email(&request.email);

    let mut user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(request.password.clone(), user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    ensure_can_sign_in(&user)?;

    let now = now_ts();
    collection
        .update_one(doc! { "_id": user.id }, doc! { "$set": { "last_login": now } })
        .await?;
    user.last_login = Some(now);

    auth_response(jwt, user)
}

pub async fn refresh_token(
    db: &MongoDB,
    jwt: &JwtConfig,
    request: &RefreshTokenRequest,
) -> AppResult<AuthResponse> {
    let claims = verify_token(jwt, &request.refresh_token, TokenKind::Refresh)
        .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".into()))?;
    let user_id = claims.user_id()?;

    let user = db
        .collection::<User>(USERS)
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    ensure_can_sign_in(&user)?;

    auth_response(jwt, user)
}

/// Soft deletes the account; the user can no longer sign in.
pub async fn delete_account(db: &MongoDB, user_id: &ObjectId) -> AppResult<()> {
    let now = now_ts();
    let result = db
        .collection::<User>(USERS)
        .update_one(
            doc! { "_id": user_id, "is_deleted": false },
            doc! { "$set": { "is_deleted": true, "is_active": false, "deleted_at": now, "updated_at": now } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    log::info!("🗑️ Account {} soft deleted", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Linus".into(),
            email: "linus@kodr.dev".into(),
            password_hash: String::new(),
            role: Role::Admin,
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

    #[test]
    fn access_token_round_trip() {
        let jwt = JwtConfig::default();
        let u = user();
        let pair = issue_tokens(&jwt, &u).unwrap();

        let claims = verify_token(&jwt, &pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, u.id_hex());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "kodr-api");
        assert_eq!(pair.expires_in, 24 * 3600);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let jwt = JwtConfig::default();
        let pair = issue_tokens(&jwt, &user()).unwrap();

        assert!(verify_token(&jwt, &pair.refresh_token, TokenKind::Access).is_err());
        assert!(verify_token(&jwt, &pair.access_token, TokenKind::Refresh).is_err());
        assert!(verify_token(&jwt, &pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn rejects_foreign_secret_and_audience() {
        let jwt = JwtConfig::default();
        let pair = issue_tokens(&jwt, &user()).unwrap();

        let other_secret = JwtConfig { secret: "another".into(), ..JwtConfig::default() };
        assert!(verify_token(&other_secret, &pair.access_token, TokenKind::Access).is_err());

        let other_aud = JwtConfig { audience: "someone-else".into(), ..JwtConfig::default() };
        assert!(verify_token(&other_aud, &pair.access_token, TokenKind::Access).is_err());
    }

    #[test]
    fn rejects_expired_tokens() {
        let jwt = JwtConfig { access_ttl_hours: -2, ..JwtConfig::default() };
        let pair = issue_tokens(&jwt, &user()).unwrap();
        assert!(matches!(
            verify_token(&jwt, &pair.access_token, TokenKind::Access),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn unsaved_user_gets_no_tokens() {
        let mut u = user();
        u.id = None;
        assert!(issue_tokens(&JwtConfig::default(), &u).is_err());
    }

    #[test]
    fn blocks_deleted_accounts() {
        let mut u = user();
        assert!(ensure_can_sign_in(&u).is_ok());
        u.is_deleted = true;
        assert!(matches!(ensure_can_sign_in(&u), Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hashed = hash_password("correct horse".into()).await.unwrap();
        assert!(verify_password("correct horse".into(), hashed.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), hashed).await.unwrap());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Kodr.DEV "), "ada@kodr.dev");
    }
}
