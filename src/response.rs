// src/response.rs

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::AppError;

/// Error payload carried inside the error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Response body awaiting its request path.
///
/// Handlers and errors attach an `Envelope` to the response extensions;
/// `envelope_middleware` re-renders it with the path of the request.
#[derive(Debug, Clone)]
pub enum Envelope {
    Success(Value),
    Error(ErrorBody),
}

impl Envelope {
    pub fn render(&self, path: &str) -> Value {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match self {
            Envelope::Success(data) => json!({
                "success": true,
                "data": data,
                "timestamp": timestamp,
                "path": path,
            }),
            Envelope::Error(error) => json!({
                "success": false,
                "error": error,
                "timestamp": timestamp,
                "path": path,
            }),
        }
    }
}

pub(crate) fn envelope_response(status: StatusCode, envelope: Envelope) -> Response {
    let mut response = (status, Json(envelope.render(""))).into_response();
    response.extensions_mut().insert(envelope);
    response
}

/// Standard success envelope around `data`.
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(value) => envelope_response(self.status, Envelope::Success(value)),
            Err(e) => AppError::InternalServerError(e.to_string()).into_response(),
        }
    }
}

/// A page of results.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Axum Middleware: renders envelopes with the request path.
///
/// Bare 429 responses (from the rate limiter) are wrapped as `RATE_LIMITED`.
pub async fn envelope_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let mut response = next.run(req).await;

    let envelope = match response.extensions_mut().remove::<Envelope>() {
        Some(envelope) => envelope,
        None if response.status() == StatusCode::TOO_MANY_REQUESTS => {
            let err = AppError::RateLimited("Too many requests, slow down".to_string());
            Envelope::Error(ErrorBody {
                code: err.code().to_string(),
                message: err.public_message(),
                status: err.status().as_u16(),
                details: None,
            })
        }
        None => return response,
    };

    let bytes = serde_json::to_vec(&envelope.render(&path)).unwrap_or_default();
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let rendered = Envelope::Success(json!({"id": 1})).render("/api/papers");
        assert_eq!(rendered["success"], true);
        assert_eq!(rendered["data"]["id"], 1);
        assert_eq!(rendered["path"], "/api/papers");
        assert!(rendered["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn error_envelope_omits_empty_details() {
        let rendered = Envelope::Error(ErrorBody {
            code: "NOT_FOUND".to_string(),
            message: "Paper not found".to_string(),
            status: 404,
            details: None,
        })
        .render("/api/papers/1");
        assert_eq!(rendered["success"], false);
        assert_eq!(rendered["error"]["code"], "NOT_FOUND");
        assert!(rendered["error"].get("details").is_none());
    }
}
