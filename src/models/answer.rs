// src/models/answer.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::{models::question::AnswerValue, utils::scoring::QuestionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "answer_status", rename_all = "snake_case")]
pub enum AnswerStatus {
    InProgress,
    Completed,
    Graded,
}

/// Represents the 'answers' table: one student's submission against a paper.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub student_name: Option<String>,
    pub student_email: Option<String>,

    /// Question id -> submitted value.
    pub responses: Json<HashMap<String, AnswerValue>>,

    pub score: i32,
    pub total_score: i32,

    /// Seconds.
    pub time_spent: i32,

    pub status: AnswerStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// DTO for a quiz submission.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 16))]
    pub quiz_code: String,
    #[validate(length(min = 1, max = 100))]
    pub student_name: Option<String>,
    #[validate(email)]
    pub student_email: Option<String>,
    #[serde(default)]
    pub responses: HashMap<String, AnswerValue>,
    #[validate(range(min = 0.0))]
    pub time_spent: f64,
}

/// Per-question verdict returned when the paper shows answers.
#[derive(Debug, Serialize)]
pub struct ReviewedQuestion {
    #[serde(flatten)]
    pub result: QuestionResult,
    pub correct_answer: AnswerValue,
    pub explanation: Option<String>,
}

/// Response to a quiz submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub answer_id: Uuid,
    pub score: i32,
    pub total_score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ReviewedQuestion>>,
}

/// DTO for manual grading.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeAnswerRequest {
    #[validate(range(min = 0))]
    pub score: i32,
}

/// Per-question statistics in a paper report.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuestionStat {
    pub question_id: Uuid,
    pub attempts: i64,
    pub correct: i64,
    pub correct_rate: f64,
}

/// Aggregated results for a paper.
#[derive(Debug, Serialize)]
pub struct PaperReport {
    pub paper_id: Uuid,
    pub submissions: i64,
    pub average_score: f64,
    pub highest_score: Option<i32>,
    pub lowest_score: Option<i32>,
    pub total_score: i32,
    pub questions: Vec<QuestionStat>,
}
