// src/error.rs

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::response::{Envelope, ErrorBody, envelope_response};

/// Global Application Error Enum.
/// Every variant maps to a fixed HTTP status and a machine-readable code.
#[derive(Debug)]
pub enum AppError {
    // 402 Payment Required: plan limit reached for a resource
    QuotaExceeded { resource: String, limit: i64 },

    // 404 Not Found
    NotFound(String),

    // 403 Forbidden
    PermissionDenied(String),

    // 400 Bad Request, with optional per-field details
    Validation {
        message: String,
        details: Option<Value>,
    },

    // 409 Conflict
    Conflict(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 429 Too Many Requests
    RateLimited(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // 400 Bad Request: paper status does not allow the operation
    InvalidPaperState(String),

    // 409 Conflict: the student already submitted this paper
    DuplicateSubmission(String),

    // 404 Not Found: malformed, unknown or unpublished quiz code
    InvalidQuizCode(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn quota_exceeded(resource: impl Into<String>, limit: i64) -> Self {
        AppError::QuotaExceeded {
            resource: resource.into(),
            limit,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) | AppError::InvalidQuizCode(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } | AppError::InvalidPaperState(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::DuplicateSubmission(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::RateLimited(_) => "RATE_LIMITED",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::InvalidPaperState(_) => "INVALID_PAPER_STATE",
            AppError::DuplicateSubmission(_) => "DUPLICATE_SUBMISSION",
            AppError::InvalidQuizCode(_) => "INVALID_QUIZ_CODE",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the caller. Internal details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            AppError::QuotaExceeded { resource, limit } => {
                format!("Quota exceeded for {resource}: limit is {limit}")
            }
            AppError::InternalServerError(_) => "Internal Server Error".to_string(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound(msg)
            | AppError::PermissionDenied(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::RateLimited(msg)
            | AppError::ServiceUnavailable(msg)
            | AppError::InvalidPaperState(msg)
            | AppError::DuplicateSubmission(msg)
            | AppError::InvalidQuizCode(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation { details, .. } => details.clone(),
            AppError::QuotaExceeded { resource, limit } => {
                Some(json!({ "resource": resource, "limit": limit }))
            }
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "{}: {}", self.code(), msg),
            _ => write!(f, "{}: {}", self.code(), self.public_message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts the error into the standard error envelope.
/// The envelope middleware fills in the request path.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
            }
            _ => {}
        }

        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.public_message(),
            status: status.as_u16(),
            details: self.details(),
        };

        envelope_response(status, Envelope::Error(body))
    }
}

/// Maps a Postgres SQLSTATE to a semantic error.
fn classify_sqlstate(code: &str) -> Option<AppError> {
    match code {
        "23505" => Some(AppError::Conflict("Resource already exists".to_string())),
        "23503" => Some(AppError::validation("Referenced resource does not exist")),
        "23502" => Some(AppError::validation("A required field is missing")),
        _ => None,
    }
}

/// Heuristic fallback for database failures that carry no usable error code.
pub fn classify_database_message(message: &str) -> AppError {
    if message.contains("duplicate key") {
        AppError::Conflict("Resource already exists".to_string())
    } else if message.contains("foreign key") {
        AppError::validation("Referenced resource does not exist")
    } else if message.contains("not-null") {
        AppError::validation("A required field is missing")
    } else if message.contains("PGRST") {
        AppError::NotFound("Resource not found".to_string())
    } else {
        AppError::InternalServerError(message.to_string())
    }
}

/// Converts `sqlx::Error` into a semantic `AppError`.
/// Typed information (SQLSTATE, error kind) wins over message matching.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => db_err
                .code()
                .and_then(|code| classify_sqlstate(&code))
                .unwrap_or_else(|| classify_database_message(db_err.message())),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::ServiceUnavailable("Database is unavailable".to_string())
            }
            _ => classify_database_message(&err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Map::new();
        collect_validation_errors(&errors, "", &mut fields);
        AppError::Validation {
            message: "Validation failed".to_string(),
            details: Some(Value::Object(fields)),
        }
    }
}

/// Flattens nested validator output into `{ "field.path": ["message", ...] }`.
fn collect_validation_errors(errors: &ValidationErrors, prefix: &str, out: &mut Map<String, Value>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = list
                    .iter()
                    .map(|e| {
                        Value::String(
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string()),
                        )
                    })
                    .collect();
                out.insert(path, Value::Array(messages));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_errors(nested, &path, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_errors(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
