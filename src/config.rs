use crate::utils::error::AppError;
use std::env;

const DEV_JWT_SECRET: &str = "default-secret-change-me";

/// Runtime configuration, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub code_runner_url: String,
    pub code_runner_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_JWT_SECRET.to_string(),
            issuer: "kodr-api".to_string(),
            audience: "kodr-clients".to_string(),
            access_ttl_hours: 24,
            refresh_ttl_days: 30,
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                log::warn!("⚠️  JWT_SECRET not set, using development secret");
                defaults.secret
            }
        };

        Ok(Self {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_ttl_hours: parse_var("JWT_EXPIRY_HOURS", defaults.access_ttl_hours)?,
            refresh_ttl_days: parse_var("REFRESH_EXPIRY_DAYS", defaults.refresh_ttl_days)?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".into()))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:8081".to_string(),
                    "http://localhost:19006".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 5000)?,
            database_url,
            jwt: JwtConfig::from_env()?,
            cors_origins,
            code_runner_url: env::var("CODE_RUNNER_URL")
                .unwrap_or_else(|_| "https://emkc.org/api/v2/piston/execute".to_string()),
            code_runner_timeout_secs: parse_var("CODE_RUNNER_TIMEOUT_SECS", 10)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_normalizes_origins() {
        let origins = split_origins(" https://kodr.dev/ ,http://localhost:3000,, ");
        assert_eq!(origins, vec!["https://kodr.dev", "http://localhost:3000"]);
    }

    #[test]
    fn jwt_defaults_are_sane() {
        let jwt = JwtConfig::default();
        assert_eq!(jwt.access_ttl_hours, 24);
        assert_eq!(jwt.refresh_ttl_days, 30);
        assert_eq!(jwt.issuer, "kodr-api");
    }
}
