// src/handlers/mod.rs

pub mod feedback;
pub mod health;
pub mod papers;
pub mod questions;
pub mod quiz;
pub mod reports;

use crate::error::AppError;

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
