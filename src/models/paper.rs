// src/models/paper.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{PublicQuestion, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "paper_status", rename_all = "lowercase")]
pub enum PaperStatus {
    Draft,
    Published,
    Archived,
}

impl PaperStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaperStatus::Draft => "draft",
            PaperStatus::Published => "published",
            PaperStatus::Archived => "archived",
        }
    }

    /// Papers move forward only: draft -> published -> archived, or draft -> archived.
    pub fn can_transition_to(self, next: PaperStatus) -> bool {
        matches!(
            (self, next),
            (PaperStatus::Draft, PaperStatus::Published)
                | (PaperStatus::Published, PaperStatus::Archived)
                | (PaperStatus::Draft, PaperStatus::Archived)
        )
    }
}

/// Delivery settings, stored as JSON on the paper row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PaperSettings {
    /// Minutes; no limit when unset.
    #[validate(range(min = 1, max = 600))]
    pub time_limit: Option<i32>,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_answers: bool,
    pub allow_review: bool,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            time_limit: None,
            shuffle_questions: false,
            shuffle_options: false,
            show_answers: true,
            allow_review: true,
        }
    }
}

/// Represents the 'papers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,

    /// Ordered question references.
    pub question_ids: Vec<Uuid>,

    pub settings: Json<PaperSettings>,
    pub status: PaperStatus,

    /// Issued when the paper is published.
    pub quiz_code: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Paper with its resolved questions, for the owner.
#[derive(Debug, Serialize)]
pub struct PaperDetail {
    #[serde(flatten)]
    pub paper: Paper,
    pub questions: Vec<Question>,
    pub total_score: i32,
}

/// Published paper as shown to a quiz taker.
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub paper_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub quiz_code: String,
    pub settings: PaperSettings,
    pub total_score: i32,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a paper.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub question_ids: Vec<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub settings: PaperSettings,
}

/// DTO for updating a draft paper. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub question_ids: Option<Vec<Uuid>>,
    pub settings: Option<PaperSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaperListParams {
    pub status: Option<PaperStatus>,
}

#[derive(Debug, Deserialize)]
pub struct QuizCodeQuery {
    pub code: String,
}
