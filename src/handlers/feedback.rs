// src/handlers/feedback.rs

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{PathParam, QueryParams, ValidatedJson},
    models::feedback::{
        CreateFeedbackRequest, Feedback, FeedbackListParams, FeedbackStatus,
        UpdateFeedbackRequest,
    },
    response::ApiResponse,
    store::DynStore,
    utils::html::{clean_html, clean_optional},
};

/// Accepts feedback from anyone, signed in or not.
pub async fn create_feedback(
    State(store): State<DynStore>,
    ValidatedJson(payload): ValidatedJson<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = clean_html(payload.title.trim());
    let content = clean_html(payload.content.trim());
    if title.is_empty() || content.is_empty() {
        return Err(AppError::validation("Title and content cannot be empty"));
    }

    let now = Utc::now();
    let feedback = Feedback {
        id: Uuid::new_v4(),
        feedback_type: payload.feedback_type,
        title,
        content,
        rating: payload.rating,
        user_email: payload.user_email.map(|e| e.trim().to_lowercase()),
        user_name: clean_optional(payload.user_name.as_deref()),
        status: FeedbackStatus::Pending,
        admin_response: None,
        created_at: now,
        updated_at: now,
    };

    store.insert_feedback(&feedback).await?;
    tracing::info!(feedback_id = %feedback.id, "Feedback received");

    Ok(ApiResponse::created(json!({ "id": feedback.id })))
}

/// Lists feedback, newest first. Admin only.
pub async fn list_feedback(
    State(store): State<DynStore>,
    QueryParams(params): QueryParams<FeedbackListParams>,
) -> Result<impl IntoResponse, AppError> {
    let items = store.list_feedback(params.status).await?;
    Ok(ApiResponse::ok(items))
}

/// Sets the review status and optional response. Admin only.
pub async fn update_feedback(
    State(store): State<DynStore>,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut feedback = store
        .get_feedback(id)
        .await?
        .ok_or(AppError::NotFound("Feedback not found".to_string()))?;

    feedback.status = payload.status;
    if let Some(response) = payload.admin_response {
        feedback.admin_response = clean_optional(Some(&response));
    }
    feedback.updated_at = Utc::now();

    if !store.update_feedback(&feedback).await? {
        return Err(AppError::NotFound("Feedback not found".to_string()));
    }

    tracing::info!(feedback_id = %id, status = ?feedback.status, "Feedback reviewed");
    Ok(ApiResponse::ok(feedback))
}
