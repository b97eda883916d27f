// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        answer::Answer,
        feedback::{Feedback, FeedbackStatus},
        paper::{Paper, PaperStatus},
        question::{Question, QuestionFilter},
    },
    store::QuizStore,
};

const QUESTION_COLUMNS: &str = "id, user_id, type, content, options, answer, explanation, tags, \
     difficulty, points, created_at, updated_at";

const PAPER_COLUMNS: &str = "id, user_id, title, description, question_ids, settings, status, \
     quiz_code, created_at, updated_at";

const ANSWER_COLUMNS: &str = "id, paper_id, student_name, student_email, responses, score, \
     total_score, time_spent, status, started_at, submitted_at";

const FEEDBACK_COLUMNS: &str = "id, type, title, content, rating, user_email, user_name, status, \
     admin_response, created_at, updated_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the WHERE clause shared by the question list and count queries.
fn push_question_filters(builder: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &QuestionFilter) {
    builder.push(" WHERE user_id = ");
    builder.push_bind(user_id);

    if let Some(question_type) = filter.question_type {
        builder.push(" AND type = ");
        builder.push_bind(question_type);
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ");
        builder.push_bind(difficulty);
    }

    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        builder.push(" AND ");
        builder.push_bind(tag.to_string());
        builder.push(" = ANY(tags)");
    }

    if let Some(search) = filter.search_term() {
        builder.push(" AND content ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(search)));
        builder.push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl QuizStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_questions(
        &self,
        user_id: Uuid,
        filter: &QuestionFilter,
    ) -> Result<(Vec<Question>, i64), AppError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM questions");
        push_question_filters(&mut count_builder, user_id, filter);
        let total: i64 = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions"));
        push_question_filters(&mut builder, user_id, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(filter.limit());
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset());

        let items = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list questions: {:?}", e);
                AppError::from(e)
            })?;

        Ok((items, total))
    }

    async fn count_questions(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_question(&self, user_id: Uuid, id: Uuid) -> Result<Option<Question>, AppError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn get_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        // Restore the caller's ordering.
        Ok(ids
            .iter()
            .filter_map(|id| rows.iter().find(|q| q.id == *id).cloned())
            .collect())
    }

    async fn insert_question(&self, question: &Question) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO questions
            (id, user_id, type, content, options, answer, explanation, tags, difficulty, points, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(question.id)
        .bind(question.user_id)
        .bind(question.question_type)
        .bind(&question.content)
        .bind(&question.options)
        .bind(&question.answer)
        .bind(&question.explanation)
        .bind(&question.tags)
        .bind(question.difficulty)
        .bind(question.points)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn update_question(&self, question: &Question) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE questions SET
                type = $1, content = $2, options = $3, answer = $4, explanation = $5,
                tags = $6, difficulty = $7, points = $8, updated_at = $9
            WHERE id = $10 AND user_id = $11
            "#,
        )
        .bind(question.question_type)
        .bind(&question.content)
        .bind(&question.options)
        .bind(&question.answer)
        .bind(&question.explanation)
        .bind(&question.tags)
        .bind(question.difficulty)
        .bind(question.points)
        .bind(question.updated_at)
        .bind(question.id)
        .bind(question.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::from(e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_question(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn question_in_published_paper(&self, question_id: Uuid) -> Result<bool, AppError> {
        let in_use = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM papers WHERE status = $1 AND $2 = ANY(question_ids))",
        )
        .bind(PaperStatus::Published)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(in_use)
    }

    async fn list_papers(
        &self,
        user_id: Uuid,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError> {
        let papers = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers \
             WHERE user_id = $1 AND ($2::paper_status IS NULL OR status = $2) \
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(papers)
    }

    async fn count_papers(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM papers WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_paper(&self, user_id: Uuid, id: Uuid) -> Result<Option<Paper>, AppError> {
        let paper = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(paper)
    }

    async fn insert_paper(&self, paper: &Paper) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO papers
            (id, user_id, title, description, question_ids, settings, status, quiz_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(paper.id)
        .bind(paper.user_id)
        .bind(&paper.title)
        .bind(&paper.description)
        .bind(&paper.question_ids)
        .bind(&paper.settings)
        .bind(paper.status)
        .bind(&paper.quiz_code)
        .bind(paper.created_at)
        .bind(paper.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create paper: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn update_paper(&self, paper: &Paper) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE papers SET
                title = $1, description = $2, question_ids = $3, settings = $4,
                status = $5, quiz_code = $6, updated_at = $7
            WHERE id = $8 AND user_id = $9
            "#,
        )
        .bind(&paper.title)
        .bind(&paper.description)
        .bind(&paper.question_ids)
        .bind(&paper.settings)
        .bind(paper.status)
        .bind(&paper.quiz_code)
        .bind(paper.updated_at)
        .bind(paper.id)
        .bind(paper.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update paper: {:?}", e);
            AppError::from(e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_paper(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM papers WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_published_by_code(&self, code: &str) -> Result<Option<Paper>, AppError> {
        let paper = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE quiz_code = $1 AND status = $2"
        ))
        .bind(code)
        .bind(PaperStatus::Published)
        .fetch_optional(&self.pool)
        .await?;
        Ok(paper)
    }

    async fn quiz_code_in_use(&self, code: &str) -> Result<bool, AppError> {
        let in_use = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM papers WHERE quiz_code = $1 AND status = $2)",
        )
        .bind(code)
        .bind(PaperStatus::Published)
        .fetch_one(&self.pool)
        .await?;
        Ok(in_use)
    }

    async fn insert_answer(&self, answer: &Answer) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO answers
            (id, paper_id, student_name, student_email, responses, score, total_score,
             time_spent, status, started_at, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(answer.id)
        .bind(answer.paper_id)
        .bind(&answer.student_name)
        .bind(&answer.student_email)
        .bind(&answer.responses)
        .bind(answer.score)
        .bind(answer.total_score)
        .bind(answer.time_spent)
        .bind(answer.status)
        .bind(answer.started_at)
        .bind(answer.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store answer: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<Answer>, AppError> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn list_answers(&self, paper_id: Uuid) -> Result<Vec<Answer>, AppError> {
        let answers = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE paper_id = $1 ORDER BY started_at DESC"
        ))
        .bind(paper_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn has_finished_submission(
        &self,
        paper_id: Uuid,
        email: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM answers
                WHERE paper_id = $1 AND lower(student_email) = lower($2)
                  AND status <> 'in_progress'
            )
            "#,
        )
        .bind(paper_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn update_answer(&self, answer: &Answer) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE answers SET
                score = $1, total_score = $2, status = $3, responses = $4, submitted_at = $5
            WHERE id = $6
            "#,
        )
        .bind(answer.score)
        .bind(answer.total_score)
        .bind(answer.status)
        .bind(&answer.responses)
        .bind(answer.submitted_at)
        .bind(answer.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO feedback
            (id, type, title, content, rating, user_email, user_name, status, admin_response, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(feedback.id)
        .bind(feedback.feedback_type)
        .bind(&feedback.title)
        .bind(&feedback.content)
        .bind(feedback.rating)
        .bind(&feedback.user_email)
        .bind(&feedback.user_name)
        .bind(feedback.status)
        .bind(&feedback.admin_response)
        .bind(feedback.created_at)
        .bind(feedback.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store feedback: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn list_feedback(
        &self,
        status: Option<FeedbackStatus>,
    ) -> Result<Vec<Feedback>, AppError> {
        let list = sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback \
             WHERE ($1::feedback_status IS NULL OR status = $1) \
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn update_feedback(&self, feedback: &Feedback) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE feedback SET status = $1, admin_response = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(feedback.status)
        .bind(&feedback.admin_response)
        .bind(feedback.updated_at)
        .bind(feedback.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
