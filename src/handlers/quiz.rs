// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{QueryParams, ValidatedJson},
    models::{
        answer::{Answer, AnswerStatus, ReviewedQuestion, SubmissionResult, SubmitAnswerRequest},
        paper::{Paper, QuizCodeQuery, QuizView},
        question::{AnswerValue, PublicQuestion},
    },
    response::ApiResponse,
    store::{DynStore, QuizStore},
    utils::{
        quiz_code::{is_valid_quiz_code, normalize_quiz_code},
        scoring::{AnswerKey, calculate_score, grade_responses},
    },
};

/// Resolves a user-supplied code to a published paper.
async fn published_paper(store: &dyn QuizStore, raw_code: &str) -> Result<Paper, AppError> {
    let code = normalize_quiz_code(raw_code);
    if !is_valid_quiz_code(&code) {
        return Err(AppError::InvalidQuizCode(
            "Quiz code must be 6 characters".to_string(),
        ));
    }

    store
        .find_published_by_code(&code)
        .await?
        .ok_or(AppError::InvalidQuizCode(
            "Quiz code is invalid or has expired".to_string(),
        ))
}

/// Fetches a published paper by quiz code for taking.
///
/// Answers and explanations are stripped. Questions and options are
/// shuffled when the paper settings ask for it.
pub async fn get_quiz(
    State(store): State<DynStore>,
    QueryParams(query): QueryParams<QuizCodeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let paper = published_paper(store.as_ref(), &query.code).await?;
    let questions = store.get_questions(&paper.question_ids).await?;
    let settings = paper.settings.0.clone();

    let mut public: Vec<PublicQuestion> = questions.iter().map(PublicQuestion::from).collect();
    {
        let mut rng = rand::thread_rng();
        if settings.shuffle_questions {
            public.shuffle(&mut rng);
        }
        if settings.shuffle_options {
            for question in &mut public {
                if let Some(options) = question.options.as_mut() {
                    options.shuffle(&mut rng);
                }
            }
        }
    }

    Ok(ApiResponse::ok(QuizView {
        paper_id: paper.id,
        title: paper.title,
        description: paper.description,
        quiz_code: paper.quiz_code.unwrap_or_default(),
        settings,
        total_score: questions.iter().map(|q| q.points).sum(),
        questions: public,
    }))
}

/// Submits a student's responses and scores them.
///
/// * Rejects a second finished submission from the same email.
/// * Responses to questions outside the paper are dropped.
/// * Time spent beyond the paper's time limit is clamped.
pub async fn submit_quiz(
    State(store): State<DynStore>,
    ValidatedJson(payload): ValidatedJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let paper = published_paper(store.as_ref(), &payload.quiz_code).await?;

    let student_email = payload
        .student_email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    if let Some(email) = &student_email {
        if store.has_finished_submission(paper.id, email).await? {
            return Err(AppError::DuplicateSubmission(
                "This email has already submitted the quiz".to_string(),
            ));
        }
    }

    let questions = store.get_questions(&paper.question_ids).await?;
    let keys: Vec<AnswerKey> = questions.iter().map(AnswerKey::from).collect();

    let responses: HashMap<String, AnswerValue> = payload
        .responses
        .into_iter()
        .filter(|(id, _)| keys.iter().any(|k| k.id == *id))
        .collect();

    let (score, total_score) = calculate_score(&responses, &keys);

    let mut time_spent = payload.time_spent.round().min(i32::MAX as f64) as i32;
    if let Some(limit_minutes) = paper.settings.time_limit {
        time_spent = time_spent.min(limit_minutes.saturating_mul(60));
    }

    let submitted_at = Utc::now();
    let answer = Answer {
        id: Uuid::new_v4(),
        paper_id: paper.id,
        student_name: payload.student_name.map(|n| n.trim().to_string()),
        student_email,
        responses: Json(responses),
        score,
        total_score,
        time_spent,
        status: AnswerStatus::Completed,
        started_at: submitted_at - Duration::seconds(time_spent as i64),
        submitted_at: Some(submitted_at),
    };

    store.insert_answer(&answer).await.map_err(|e| match e {
        // Lost the race against a concurrent submission with the same email.
        AppError::Conflict(_) => AppError::DuplicateSubmission(
            "This email has already submitted the quiz".to_string(),
        ),
        other => other,
    })?;

    tracing::info!(
        answer_id = %answer.id,
        paper_id = %paper.id,
        score,
        total_score,
        "Submission scored"
    );

    let results = paper.settings.show_answers.then(|| {
        grade_responses(&answer.responses, &keys)
            .into_iter()
            .zip(questions.iter())
            .map(|(result, question)| ReviewedQuestion {
                result,
                correct_answer: question.answer.0.clone(),
                explanation: question.explanation.clone(),
            })
            .collect()
    });

    Ok(ApiResponse::created(SubmissionResult {
        answer_id: answer.id,
        score,
        total_score,
        results,
    }))
}
