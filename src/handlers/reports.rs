// src/handlers/reports.rs

use axum::{Extension, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{PathParam, ValidatedJson},
    handlers::papers::{owned_paper, total_points},
    models::{
        answer::{Answer, AnswerStatus, GradeAnswerRequest, PaperReport, QuestionStat},
        paper::Paper,
        question::Question,
    },
    response::ApiResponse,
    store::{DynStore, QuizStore},
    utils::{jwt::Claims, scoring::is_correct},
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates finished submissions into a report.
///
/// In-progress answers are ignored. Each question's correct rate is the
/// share of finished submissions that answered it correctly.
pub fn build_report(paper: &Paper, questions: &[Question], answers: &[Answer]) -> PaperReport {
    let finished: Vec<&Answer> = answers
        .iter()
        .filter(|a| a.status != AnswerStatus::InProgress)
        .collect();

    let submissions = finished.len() as i64;
    let average_score = if finished.is_empty() {
        0.0
    } else {
        let sum: i64 = finished.iter().map(|a| a.score as i64).sum();
        round2(sum as f64 / submissions as f64)
    };

    let stats = questions
        .iter()
        .map(|question| {
            let key = question.id.to_string();
            let mut attempts = 0;
            let mut correct = 0;
            for answer in &finished {
                if let Some(value) = answer.responses.get(&key) {
                    attempts += 1;
                    if is_correct(&question.answer.0, value) {
                        correct += 1;
                    }
                }
            }
            QuestionStat {
                question_id: question.id,
                attempts,
                correct,
                correct_rate: if submissions == 0 {
                    0.0
                } else {
                    round2(correct as f64 / submissions as f64)
                },
            }
        })
        .collect();

    PaperReport {
        paper_id: paper.id,
        submissions,
        average_score,
        highest_score: finished.iter().map(|a| a.score).max(),
        lowest_score: finished.iter().map(|a| a.score).min(),
        total_score: total_points(questions),
        questions: stats,
    }
}

/// Loads an answer whose paper belongs to the caller.
async fn owned_answer(store: &dyn QuizStore, user_id: Uuid, id: Uuid) -> Result<Answer, AppError> {
    let answer = store
        .get_answer(id)
        .await?
        .ok_or(AppError::NotFound("Answer not found".to_string()))?;

    // Answers to someone else's paper look the same as missing ones.
    if store.get_paper(user_id, answer.paper_id).await?.is_none() {
        return Err(AppError::NotFound("Answer not found".to_string()));
    }
    Ok(answer)
}

pub async fn list_paper_answers(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let paper = owned_paper(store.as_ref(), claims.user_id()?, id).await?;
    let answers = store.list_answers(paper.id).await?;
    Ok(ApiResponse::ok(answers))
}

pub async fn paper_report(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let paper = owned_paper(store.as_ref(), claims.user_id()?, id).await?;
    let questions = store.get_questions(&paper.question_ids).await?;
    let answers = store.list_answers(paper.id).await?;

    Ok(ApiResponse::ok(build_report(&paper, &questions, &answers)))
}

pub async fn get_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let answer = owned_answer(store.as_ref(), claims.user_id()?, id).await?;
    Ok(ApiResponse::ok(answer))
}

/// Overrides the score of a finished submission, typically after reading
/// its essay responses.
pub async fn grade_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(payload): ValidatedJson<GradeAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut answer = owned_answer(store.as_ref(), claims.user_id()?, id).await?;

    if answer.status == AnswerStatus::InProgress {
        return Err(AppError::validation("Answer has not been submitted yet"));
    }
    if payload.score > answer.total_score {
        return Err(AppError::validation(format!(
            "Score cannot exceed the total of {}",
            answer.total_score
        )));
    }

    answer.score = payload.score;
    answer.status = AnswerStatus::Graded;
    if !store.update_answer(&answer).await? {
        return Err(AppError::NotFound("Answer not found".to_string()));
    }

    tracing::info!(answer_id = %answer.id, score = answer.score, "Answer graded");
    Ok(ApiResponse::ok(answer))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;
    use crate::models::{
        paper::{PaperSettings, PaperStatus},
        question::{AnswerValue, Difficulty, QuestionType},
    };

    fn question(answer: &str, points: i32) -> Question {
        let now = Utc::now();
        Question {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            question_type: QuestionType::Fill,
            content: "2 + 2".to_string(),
            options: None,
            answer: Json(AnswerValue::Single(answer.to_string())),
            explanation: None,
            tags: vec![],
            difficulty: Difficulty::Easy,
            points,
            created_at: now,
            updated_at: now,
        }
    }

    fn paper(questions: &[Question]) -> Paper {
        let now = Utc::now();
        Paper {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: "Arithmetic".to_string(),
            description: None,
            question_ids: questions.iter().map(|q| q.id).collect(),
            settings: Json(PaperSettings::default()),
            status: PaperStatus::Published,
            quiz_code: Some("ABC234".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn answer(
        paper: &Paper,
        responses: &[(&Question, &str)],
        score: i32,
        status: AnswerStatus,
    ) -> Answer {
        let responses: HashMap<String, AnswerValue> = responses
            .iter()
            .map(|(q, v)| (q.id.to_string(), AnswerValue::Single(v.to_string())))
            .collect();
        Answer {
            id: Uuid::new_v4(),
            paper_id: paper.id,
            student_name: None,
            student_email: None,
            responses: Json(responses),
            score,
            total_score: 3,
            time_spent: 30,
            status,
            started_at: Utc::now(),
            submitted_at: Some(Utc::now()),
        }
    }

    #[test]
    fn empty_report() {
        let questions = vec![question("4", 1)];
        let paper = paper(&questions);

        let report = build_report(&paper, &questions, &[]);
        assert_eq!(report.submissions, 0);
        assert_eq!(report.average_score, 0.0);
        assert_eq!(report.highest_score, None);
        assert_eq!(report.total_score, 1);
        assert_eq!(report.questions[0].correct_rate, 0.0);
    }

    #[test]
    fn aggregates_finished_answers_only() {
        let q1 = question("4", 1);
        let q2 = question("9", 2);
        let questions = vec![q1.clone(), q2.clone()];
        let paper = paper(&questions);

        let answers = vec![
            answer(&paper, &[(&q1, "4"), (&q2, "9")], 3, AnswerStatus::Completed),
            answer(&paper, &[(&q1, "5")], 0, AnswerStatus::Completed),
            answer(&paper, &[(&q1, "4")], 2, AnswerStatus::Graded),
            answer(&paper, &[(&q1, "4"), (&q2, "9")], 3, AnswerStatus::InProgress),
        ];

        let report = build_report(&paper, &questions, &answers);
        assert_eq!(report.submissions, 3);
        assert_eq!(report.average_score, 1.67);
        assert_eq!(report.highest_score, Some(3));
        assert_eq!(report.lowest_score, Some(0));
        assert_eq!(report.total_score, 3);

        assert_eq!(report.questions[0].attempts, 3);
        assert_eq!(report.questions[0].correct, 2);
        assert_eq!(report.questions[0].correct_rate, 0.67);
        assert_eq!(report.questions[1].attempts, 1);
        assert_eq!(report.questions[1].correct_rate, 0.33);
    }
}
