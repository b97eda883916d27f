// src/models/feedback.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "feedback_type", rename_all = "lowercase")]
pub enum FeedbackType {
    Bug,
    Feature,
    Question,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "feedback_status", rename_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Reviewed,
    Resolved,
    Rejected,
}

/// Represents the 'feedback' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub title: String,
    pub content: String,
    pub rating: Option<i32>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub status: FeedbackStatus,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for submitting feedback.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedbackRequest {
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(email)]
    pub user_email: Option<String>,
    #[validate(length(max = 100))]
    pub user_name: Option<String>,
}

/// DTO for an admin reviewing feedback.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeedbackRequest {
    pub status: FeedbackStatus,
    #[validate(length(max = 2000))]
    pub admin_response: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackListParams {
    pub status: Option<FeedbackStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_limits() {
        let ok: CreateFeedbackRequest = serde_json::from_value(serde_json::json!({
            "type": "bug",
            "title": "Timer stops",
            "content": "The timer froze at 00:10",
            "rating": 4
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad_rating = CreateFeedbackRequest { rating: Some(6), ..ok };
        assert!(bad_rating.validate().is_err());

        let long_title = CreateFeedbackRequest {
            title: "x".repeat(101),
            rating: None,
            ..bad_rating
        };
        assert!(long_title.validate().is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<CreateFeedbackRequest>(serde_json::json!({
            "type": "praise",
            "title": "Nice",
            "content": "Nice app"
        }));
        assert!(parsed.is_err());
    }
}
