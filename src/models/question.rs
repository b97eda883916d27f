// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "question_type", rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
    Fill,
    Essay,
}

impl QuestionType {
    /// Choice questions carry an option list.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::Single | QuestionType::Multiple)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// A stored answer key or a submitted response: one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,

    /// Owner of the question.
    pub user_id: Uuid,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub content: String,

    /// Option strings for choice questions, stored as a JSON array.
    pub options: Option<Json<Vec<String>>>,

    /// Correct answer: a string, or a list for multiple choice.
    pub answer: Json<AnswerValue>,

    pub explanation: Option<String>,

    pub tags: Vec<String>,

    pub difficulty: Difficulty,

    pub points: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a question to quiz takers (excludes answer and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            content: q.content.clone(),
            options: q.options.as_ref().map(|o| o.0.clone()),
            points: q.points,
        }
    }
}

fn default_points() -> i32 {
    1
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub options: Option<Vec<String>>,
    pub answer: AnswerValue,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 100))]
    pub points: i32,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    #[validate(length(min = 1, max = 5000))]
    pub content: Option<String>,
    pub options: Option<Vec<String>>,
    pub answer: Option<AnswerValue>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1, max = 100))]
    pub points: Option<i32>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.question_type.is_none()
            && self.content.is_none()
            && self.options.is_none()
            && self.answer.is_none()
            && self.explanation.is_none()
            && self.tags.is_none()
            && self.difficulty.is_none()
            && self.points.is_none()
    }
}

/// Query parameters for listing questions.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionFilter {
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Highest page a client can ask for; keeps `offset` within `i64`.
const MAX_PAGE: i64 = i64::MAX / 100;

impl QuestionFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Non-blank search term.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

pub fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    for tag in tags {
        if tag.trim().is_empty() || tag.chars().count() > 30 {
            return Err(validator::ValidationError::new("invalid_tag"));
        }
    }
    Ok(())
}

/// Checks that options and answer fit the question type.
///
/// * choice questions need at least 2 non-empty, distinct options;
/// * single/fill/essay answers are one string, multiple answers are a non-empty list;
/// * choice answers must name existing options.
pub fn check_question_shape(
    question_type: QuestionType,
    options: Option<&[String]>,
    answer: &AnswerValue,
) -> Result<(), AppError> {
    if question_type.is_choice() {
        let options = options.unwrap_or_default();
        if options.len() < 2 {
            return Err(AppError::validation(
                "Choice questions need at least 2 options",
            ));
        }
        let bad_option = |o: &String| o.trim().is_empty() || o.chars().count() > 500;
        if options.len() > 26 || options.iter().any(bad_option) {
            return Err(AppError::validation("Options must be 1 to 500 characters, at most 26"));
        }
        let mut unique: Vec<&String> = options.iter().collect();
        unique.sort();
        unique.dedup();
        if unique.len() != options.len() {
            return Err(AppError::validation("Options must be distinct"));
        }
    }

    match (question_type, answer) {
        (QuestionType::Multiple, AnswerValue::Multiple(values)) => {
            if values.is_empty() {
                return Err(AppError::validation(
                    "Multiple choice answers need at least one value",
                ));
            }
        }
        (QuestionType::Multiple, AnswerValue::Single(_)) => {
            return Err(AppError::validation(
                "Multiple choice answers must be a list",
            ));
        }
        (_, AnswerValue::Multiple(_)) => {
            return Err(AppError::validation("Answer must be a single value"));
        }
        (_, AnswerValue::Single(value)) => {
            if question_type != QuestionType::Essay && value.trim().is_empty() {
                return Err(AppError::validation("Answer cannot be empty"));
            }
        }
    }

    if let (true, Some(options)) = (question_type.is_choice(), options) {
        let values: Vec<&String> = match answer {
            AnswerValue::Single(v) => vec![v],
            AnswerValue::Multiple(vs) => vs.iter().collect(),
        };
        if values.iter().any(|v| !options.contains(*v)) {
            return Err(AppError::validation("Answer must be one of the options"));
        }
    }

    Ok(())
}
