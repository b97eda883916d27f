// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;

/// Which persistence backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    /// Shared HS256 secret of the identity provider.
    pub jwt_secret: String,
    /// Expected `aud` claim; audience is not checked when unset.
    pub jwt_audience: Option<String>,
    pub rust_log: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub cors_origins: Vec<String>,
    /// Lower-cased emails allowed on the admin routes.
    pub admin_emails: Vec<String>,
    pub max_questions_per_user: i64,
    pub max_papers_per_user: i64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub log_dir: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "{key} has an invalid value: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_audience: lookup("JWT_AUDIENCE").filter(|v| !v.is_empty()),
            rust_log,
            port: parse_or(&lookup, "PORT", 3000)?,
            store_backend,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
            admin_emails: lookup("ADMIN_EMAILS")
                .map(|v| parse_list(&v).into_iter().map(|e| e.to_lowercase()).collect())
                .unwrap_or_default(),
            max_questions_per_user: parse_or(&lookup, "MAX_QUESTIONS_PER_USER", 500)?,
            max_papers_per_user: parse_or(&lookup, "MAX_PAPERS_PER_USER", 50)?,
            rate_limit_per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: parse_or(&lookup, "RATE_LIMIT_BURST", 30)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Splits a comma separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
