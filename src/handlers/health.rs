// src/handlers/health.rs

use axum::{extract::State, response::IntoResponse};
use serde_json::json;

use crate::{error::AppError, response::ApiResponse, store::DynStore};

/// Liveness check that also verifies the store is reachable.
pub async fn health(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    store.ping().await?;
    Ok(ApiResponse::ok(json!({
        "status": "ok",
        "store": store.backend(),
    })))
}
