//! Runtime configuration.
//!
//! Settings come from environment variables (optionally loaded from `.env`).
//! [`Config::from_lookup`] takes the variable source as a function so tests
//! never touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use crate::services::object_storage::S3Settings;
use crate::services::oauth_service::GOOGLE_USERINFO_URL;

const DEV_JWT_SECRET: &str = "dev-secret-do-not-use-in-production-change-me-now";
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters outside development")]
    WeakJwtSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    /// Allowed CORS origins. Empty means any origin.
    pub allowed_hosts: Vec<String>,
    pub debug: bool,
    pub auth_rate_limit_per_minute: u32,
    pub max_upload_bytes: usize,
    pub google_userinfo_url: String,
    /// S3 bucket settings. `None` stores uploads in `upload_dir`.
    pub s3: Option<S3Settings>,
    pub upload_dir: PathBuf,
    pub upload_staging_dir: PathBuf,
    pub public_base_url: String,
}

/// Load `.env` into the process environment if the file exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => eprintln!("Ignoring unreadable .env file: {}", e),
        _ => {}
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Value of `name`, with blank values treated as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &'static str) -> Result<bool, ConfigError> {
        match self.get(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    name,
                    value: v,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }
}

impl Config {
    /// Read the process environment. Call [`load_dotenv`] first to pick up
    /// a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let app_env = env
            .get("APP_ENV")
            .unwrap_or_else(|| "production".to_string());
        let is_development = app_env.eq_ignore_ascii_case("development");

        let port = env.parse("PORT", 9000u16)?;
        let database_url = match env.get("DATABASE_URL") {
            Some(url) => url,
            None => Self::compose_database_url(&env)?,
        };

        let jwt_secret = match env.get("JWT_SECRET") {
            Some(secret) => secret,
            None if is_development => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };
        if jwt_secret.len() < MIN_JWT_SECRET_LEN && !is_development {
            return Err(ConfigError::WeakJwtSecret);
        }

        let jwt_expiry_hours = env.parse("JWT_EXPIRY_HOURS", 24i64)?;
        if jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRY_HOURS",
                value: jwt_expiry_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let bcrypt_cost = env.parse("BCRYPT_COST", 10u32)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: "must be between 4 and 31".to_string(),
            });
        }

        let auth_rate_limit_per_minute = env.parse("AUTH_RATE_LIMIT_PER_MINUTE", 100u32)?;
        if auth_rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid {
                name: "AUTH_RATE_LIMIT_PER_MINUTE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let allowed_hosts = env
            .get("ALLOWED_HOSTS")
            .map(|hosts| {
                hosts
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let s3 = match env.get("AWS_S3_BUCKET_NAME") {
            Some(bucket) => Some(S3Settings {
                bucket,
                region: env.require("AWS_S3_REGION")?,
                access_key_id: env.require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: env.require("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Self {
            port,
            database_url,
            db_max_connections: env.parse("DB_MAX_CONNECTIONS", 10u32)?,
            jwt_secret,
            jwt_expiry_hours,
            bcrypt_cost,
            allowed_hosts,
            debug: env.flag("DEBUG")?,
            auth_rate_limit_per_minute,
            max_upload_bytes: env.parse("MAX_UPLOAD_BYTES", 20 * 1024 * 1024usize)?,
            google_userinfo_url: env
                .get("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|| GOOGLE_USERINFO_URL.to_string()),
            s3,
            upload_dir: env
                .get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            upload_staging_dir: env
                .get("UPLOAD_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            public_base_url: env
                .get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            app_env,
        })
    }

    fn compose_database_url<F>(env: &Env<F>) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = env.get("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let user = env.require("DB_USER")?;
        let password = env.get("DB_PASSWORD").unwrap_or_default();
        let name = env.require("DB_NAME")?;
        let port = env.parse("DB_PORT", 5432u16)?;
        let sslmode = env
            .get("DB_SSLMODE")
            .unwrap_or_else(|| "disable".to_string());

        Ok(format!(
            "postgres://{user}:{password}@{host}:{port}/{name}?sslmode={sslmode}"
        ))
    }

    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }

    /// Log settings that are tolerated in development only.
    pub fn log_warnings(&self) {
        if self.jwt_secret == DEV_JWT_SECRET {
            warn!("JWT_SECRET not set! Using default secret for development. DO NOT USE IN PRODUCTION!");
        } else if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            warn!("JWT_SECRET is less than 32 characters. Consider using a longer secret.");
        }
        if self.allowed_hosts.is_empty() {
            warn!("ALLOWED_HOSTS is empty, CORS accepts any origin");
        }
    }
}
