// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerStatus},
        feedback::{Feedback, FeedbackStatus},
        paper::{Paper, PaperStatus},
        question::{Question, QuestionFilter},
    },
    store::QuizStore,
};

#[derive(Default)]
struct Tables {
    questions: HashMap<Uuid, Question>,
    papers: HashMap<Uuid, Paper>,
    answers: HashMap<Uuid, Answer>,
    feedback: HashMap<Uuid, Feedback>,
}

/// In-process store for local runs and tests.
///
/// Mirrors the database constraints the handlers rely on: one published
/// paper per quiz code, one finished submission per email and paper, and
/// answers removed together with their paper.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(question: &Question, filter: &QuestionFilter) -> bool {
    if filter.question_type.is_some_and(|t| t != question.question_type) {
        return false;
    }
    if filter.difficulty.is_some_and(|d| d != question.difficulty) {
        return false;
    }
    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        if !question.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some(search) = filter.search_term() {
        if !question
            .content
            .to_lowercase()
            .contains(&search.to_lowercase())
        {
            return false;
        }
    }
    true
}

fn is_finished(answer: &Answer) -> bool {
    answer.status != AnswerStatus::InProgress
}

fn same_email(answer: &Answer, email: &str) -> bool {
    answer
        .student_email
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case(email))
}

#[async_trait]
impl QuizStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_questions(
        &self,
        user_id: Uuid,
        filter: &QuestionFilter,
    ) -> Result<(Vec<Question>, i64), AppError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Question> = tables
            .questions
            .values()
            .filter(|q| q.user_id == user_id && matches_filter(q, filter))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn count_questions(&self, user_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.questions.values().filter(|q| q.user_id == user_id).count() as i64)
    }

    async fn get_question(&self, user_id: Uuid, id: Uuid) -> Result<Option<Question>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .get(&id)
            .filter(|q| q.user_id == user_id)
            .cloned())
    }

    async fn get_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.questions.get(id).cloned())
            .collect())
    }

    async fn insert_question(&self, question: &Question) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.questions.contains_key(&question.id) {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }
        tables.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn update_question(&self, question: &Question) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.questions.get_mut(&question.id) {
            Some(existing) if existing.user_id == question.user_id => {
                *existing = question.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_question(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.questions.get(&id).is_some_and(|q| q.user_id == user_id) {
            tables.questions.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn question_in_published_paper(&self, question_id: Uuid) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.papers.values().any(|p| {
            p.status == PaperStatus::Published && p.question_ids.contains(&question_id)
        }))
    }

    async fn list_papers(
        &self,
        user_id: Uuid,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError> {
        let tables = self.tables.read().await;
        let mut papers: Vec<Paper> = tables
            .papers
            .values()
            .filter(|p| p.user_id == user_id && status.is_none_or(|s| s == p.status))
            .cloned()
            .collect();
        papers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(papers)
    }

    async fn count_papers(&self, user_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.papers.values().filter(|p| p.user_id == user_id).count() as i64)
    }

    async fn get_paper(&self, user_id: Uuid, id: Uuid) -> Result<Option<Paper>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .papers
            .get(&id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn insert_paper(&self, paper: &Paper) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.papers.contains_key(&paper.id) {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }
        tables.papers.insert(paper.id, paper.clone());
        Ok(())
    }

    async fn update_paper(&self, paper: &Paper) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;

        if paper.status == PaperStatus::Published {
            let taken = tables.papers.values().any(|other| {
                other.id != paper.id
                    && other.status == PaperStatus::Published
                    && other.quiz_code.is_some()
                    && other.quiz_code == paper.quiz_code
            });
            if taken {
                return Err(AppError::Conflict("Quiz code already in use".to_string()));
            }
        }

        match tables.papers.get_mut(&paper.id) {
            Some(existing) if existing.user_id == paper.user_id => {
                *existing = paper.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_paper(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.papers.get(&id).is_some_and(|p| p.user_id == user_id) {
            return Ok(false);
        }
        tables.papers.remove(&id);
        tables.answers.retain(|_, a| a.paper_id != id);
        Ok(true)
    }

    async fn find_published_by_code(&self, code: &str) -> Result<Option<Paper>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .papers
            .values()
            .find(|p| p.status == PaperStatus::Published && p.quiz_code.as_deref() == Some(code))
            .cloned())
    }

    async fn quiz_code_in_use(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.find_published_by_code(code).await?.is_some())
    }

    async fn insert_answer(&self, answer: &Answer) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if !tables.papers.contains_key(&answer.paper_id) {
            return Err(AppError::validation("Referenced resource does not exist"));
        }
        if let (true, Some(email)) = (is_finished(answer), answer.student_email.as_deref()) {
            let duplicate = tables.answers.values().any(|other| {
                other.paper_id == answer.paper_id && is_finished(other) && same_email(other, email)
            });
            if duplicate {
                return Err(AppError::Conflict("Resource already exists".to_string()));
            }
        }
        tables.answers.insert(answer.id, answer.clone());
        Ok(())
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<Answer>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.answers.get(&id).cloned())
    }

    async fn list_answers(&self, paper_id: Uuid) -> Result<Vec<Answer>, AppError> {
        let tables = self.tables.read().await;
        let mut answers: Vec<Answer> = tables
            .answers
            .values()
            .filter(|a| a.paper_id == paper_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(answers)
    }

    async fn has_finished_submission(
        &self,
        paper_id: Uuid,
        email: &str,
    ) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .values()
            .any(|a| a.paper_id == paper_id && is_finished(a) && same_email(a, email)))
    }

    async fn update_answer(&self, answer: &Answer) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.answers.get_mut(&answer.id) {
            Some(existing) => {
                *existing = answer.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.feedback.insert(feedback.id, feedback.clone());
        Ok(())
    }

    async fn list_feedback(
        &self,
        status: Option<FeedbackStatus>,
    ) -> Result<Vec<Feedback>, AppError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Feedback> = tables
            .feedback
            .values()
            .filter(|f| status.is_none_or(|s| s == f.status))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.feedback.get(&id).cloned())
    }

    async fn update_feedback(&self, feedback: &Feedback) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.feedback.get_mut(&feedback.id) {
            Some(existing) => {
                *existing = feedback.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;
    use crate::models::{
        paper::PaperSettings,
        question::{AnswerValue, Difficulty, QuestionType},
    };

    fn question(user_id: Uuid, content: &str, tags: &[&str], difficulty: Difficulty) -> Question {
        let now = Utc::now();
        Question {
            id: Uuid::new_v4(),
            user_id,
            question_type: QuestionType::Fill,
            content: content.to_string(),
            options: None,
            answer: Json(AnswerValue::Single("x".to_string())),
            explanation: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            difficulty,
            points: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn paper(user_id: Uuid, status: PaperStatus, code: Option<&str>) -> Paper {
        let now = Utc::now();
        Paper {
            id: Uuid::new_v4(),
            user_id,
            title: "Unit 1".to_string(),
            description: None,
            question_ids: vec![],
            settings: Json(PaperSettings::default()),
            status,
            quiz_code: code.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    fn answer(paper_id: Uuid, email: &str, status: AnswerStatus) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            paper_id,
            student_name: None,
            student_email: Some(email.to_string()),
            responses: Json(HashMap::new()),
            score: 0,
            total_score: 0,
            time_spent: 0,
            status,
            started_at: Utc::now(),
            submitted_at: None,
        }
    }

    #[tokio::test]
    async fn questions_are_owner_scoped_and_filtered() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        store
            .insert_question(&question(owner, "Capital of France", &["geo"], Difficulty::Easy))
            .await
            .unwrap();
        store
            .insert_question(&question(owner, "Speed of light", &["physics"], Difficulty::Hard))
            .await
            .unwrap();
        let foreign = question(other, "Capital of Spain", &["geo"], Difficulty::Easy);
        store.insert_question(&foreign).await.unwrap();

        let (all, total) = store
            .list_questions(owner, &QuestionFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let filter = QuestionFilter {
            tag: Some("geo".to_string()),
            ..Default::default()
        };
        let (geo, _) = store.list_questions(owner, &filter).await.unwrap();
        assert_eq!(geo.len(), 1);

        let filter = QuestionFilter {
            search: Some("LIGHT".to_string()),
            ..Default::default()
        };
        let (found, _) = store.list_questions(owner, &filter).await.unwrap();
        assert_eq!(found[0].content, "Speed of light");

        assert!(store.get_question(owner, foreign.id).await.unwrap().is_none());
        assert!(!store.delete_question(owner, foreign.id).await.unwrap());
    }

    #[tokio::test]
    async fn published_codes_are_unique() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        let first = paper(owner, PaperStatus::Published, Some("ABCDEF"));
        store.insert_paper(&first).await.unwrap();
        assert!(store.quiz_code_in_use("ABCDEF").await.unwrap());

        let mut second = paper(owner, PaperStatus::Draft, None);
        store.insert_paper(&second).await.unwrap();
        second.status = PaperStatus::Published;
        second.quiz_code = Some("ABCDEF".to_string());
        let err = store.update_paper(&second).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        let mut archived = first.clone();
        archived.status = PaperStatus::Archived;
        store.update_paper(&archived).await.unwrap();
        assert!(!store.quiz_code_in_use("ABCDEF").await.unwrap());
        assert!(store.update_paper(&second).await.unwrap());
    }

    #[tokio::test]
    async fn questions_on_published_papers_are_detected() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let q = question(owner, "Capital of France", &[], Difficulty::Easy);
        store.insert_question(&q).await.unwrap();

        let mut p = paper(owner, PaperStatus::Draft, None);
        p.question_ids = vec![q.id];
        store.insert_paper(&p).await.unwrap();
        assert!(!store.question_in_published_paper(q.id).await.unwrap());

        p.status = PaperStatus::Published;
        p.quiz_code = Some("QRSTUV".to_string());
        store.update_paper(&p).await.unwrap();
        assert!(store.question_in_published_paper(q.id).await.unwrap());
    }

    #[tokio::test]
    async fn one_finished_submission_per_email() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let p = paper(owner, PaperStatus::Published, Some("HJKMNP"));
        store.insert_paper(&p).await.unwrap();

        store
            .insert_answer(&answer(p.id, "kim@school.edu", AnswerStatus::Completed))
            .await
            .unwrap();
        assert!(store.has_finished_submission(p.id, "KIM@school.edu").await.unwrap());

        let err = store
            .insert_answer(&answer(p.id, "Kim@School.edu", AnswerStatus::Completed))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        store.delete_paper(owner, p.id).await.unwrap();
        assert!(store.list_answers(p.id).await.unwrap().is_empty());
    }
}
