// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        answer::Answer,
        feedback::{Feedback, FeedbackStatus},
        paper::{Paper, PaperStatus},
        question::{Question, QuestionFilter},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle to the configured store.
pub type DynStore = Arc<dyn QuizStore>;

/// Persistence operations used by the handlers.
///
/// Owner-scoped reads take the caller's `user_id`; rows owned by someone
/// else are reported as absent.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Short backend name for health output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    // Questions

    /// Returns one page of the owner's questions and the total match count.
    async fn list_questions(
        &self,
        user_id: Uuid,
        filter: &QuestionFilter,
    ) -> Result<(Vec<Question>, i64), AppError>;

    async fn count_questions(&self, user_id: Uuid) -> Result<i64, AppError>;

    async fn get_question(&self, user_id: Uuid, id: Uuid) -> Result<Option<Question>, AppError>;

    /// Fetches questions by id regardless of owner, in the order of `ids`.
    /// Unknown ids are skipped.
    async fn get_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>, AppError>;

    async fn insert_question(&self, question: &Question) -> Result<(), AppError>;

    /// Returns false when no owned row matched.
    async fn update_question(&self, question: &Question) -> Result<bool, AppError>;

    async fn delete_question(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// True when a published paper lists the question.
    async fn question_in_published_paper(&self, question_id: Uuid) -> Result<bool, AppError>;

    // Papers

    async fn list_papers(
        &self,
        user_id: Uuid,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError>;

    async fn count_papers(&self, user_id: Uuid) -> Result<i64, AppError>;

    async fn get_paper(&self, user_id: Uuid, id: Uuid) -> Result<Option<Paper>, AppError>;

    async fn insert_paper(&self, paper: &Paper) -> Result<(), AppError>;

    /// Fails with `Conflict` when another published paper holds the same quiz code.
    async fn update_paper(&self, paper: &Paper) -> Result<bool, AppError>;

    async fn delete_paper(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Resolves a quiz code to a published paper.
    async fn find_published_by_code(&self, code: &str) -> Result<Option<Paper>, AppError>;

    /// True when a published paper already holds `code`.
    async fn quiz_code_in_use(&self, code: &str) -> Result<bool, AppError>;

    // Answers

    /// Fails with `Conflict` when the email already has a finished submission.
    async fn insert_answer(&self, answer: &Answer) -> Result<(), AppError>;

    async fn get_answer(&self, id: Uuid) -> Result<Option<Answer>, AppError>;

    async fn list_answers(&self, paper_id: Uuid) -> Result<Vec<Answer>, AppError>;

    /// True when `email` (case-insensitive) already finished the paper.
    async fn has_finished_submission(&self, paper_id: Uuid, email: &str)
    -> Result<bool, AppError>;

    async fn update_answer(&self, answer: &Answer) -> Result<bool, AppError>;

    // Feedback

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError>;

    async fn list_feedback(
        &self,
        status: Option<FeedbackStatus>,
    ) -> Result<Vec<Feedback>, AppError>;

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>, AppError>;

    async fn update_feedback(&self, feedback: &Feedback) -> Result<bool, AppError>;
}
