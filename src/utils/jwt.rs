// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// Claims of an access token issued by the identity provider.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user's uuid.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Provider role, e.g. 'authenticated' or 'service_role'.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".to_string()))
    }

    pub fn is_admin(&self, config: &Config) -> bool {
        self.role.as_deref() == Some("service_role")
            || self
                .email
                .as_deref()
                .is_some_and(|email| config.is_admin_email(email))
    }
}

/// Signs an HS256 token the way the identity provider does.
/// Used by local tooling and tests; production tokens come from the provider.
pub fn sign_jwt(
    user_id: Uuid,
    email: Option<&str>,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_owned),
        role: Some(role.to_owned()),
        aud: Some("authenticated".to_string()),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, config: &Config) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    match &config.jwt_audience {
        Some(aud) => validation.set_audience(&[aud.as_str()]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects
/// `Claims` into the request extensions.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &config)?;
    claims.user_id()?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn admin_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !claims.is_admin(&config) {
        return Err(AppError::PermissionDenied(
            "Administrator access required".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn config() -> Config {
        Config {
            database_url: None,
            jwt_secret: "unit_test_secret".to_string(),
            jwt_audience: Some("authenticated".to_string()),
            rust_log: "error".to_string(),
            port: 0,
            store_backend: StoreBackend::Memory,
            cors_origins: vec![],
            admin_emails: vec!["admin@quizflow.io".to_string()],
            max_questions_per_user: 10,
            max_papers_per_user: 10,
            rate_limit_per_second: 10,
            rate_limit_burst: 10,
            log_dir: "logs".to_string(),
        }
    }

    #[test]
    fn round_trip_claims() {
        let config = config();
        let id = Uuid::new_v4();
        let token = sign_jwt(id, Some("t@quizflow.io"), "authenticated", &config.jwt_secret, 60)
            .unwrap();

        let claims = verify_jwt(&token, &config).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert!(!claims.is_admin(&config));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = config();
        let token = sign_jwt(Uuid::new_v4(), None, "authenticated", "other", 60).unwrap();
        let err = verify_jwt(&token, &config).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn admin_by_email_or_service_role() {
        let config = config();
        let mut claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: Some("Admin@QuizFlow.io".to_string()),
            role: Some("authenticated".to_string()),
            aud: None,
            exp: 0,
        };
        assert!(claims.is_admin(&config));

        claims.email = None;
        assert!(!claims.is_admin(&config));

        claims.role = Some("service_role".to_string());
        assert!(claims.is_admin(&config));
    }
}
