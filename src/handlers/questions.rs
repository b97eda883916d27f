// src/handlers/questions.rs

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    extract::{PathParam, QueryParams, ValidatedJson},
    models::question::{
        CreateQuestionRequest, Question, QuestionFilter, UpdateQuestionRequest,
        check_question_shape, validate_tags,
    },
    response::{ApiResponse, Paginated},
    store::{DynStore, QuizStore},
    utils::{
        html::{clean_html, clean_optional},
        jwt::Claims,
    },
};

/// Lists the caller's questions, newest first.
///
/// Supports `type`, `difficulty`, `tag` and `search` filters plus `page`/`limit`.
pub async fn list_questions(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    QueryParams(filter): QueryParams<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let (items, total) = store.list_questions(user_id, &filter).await?;

    Ok(ApiResponse::ok(Paginated {
        items,
        total,
        page: filter.page(),
        limit: filter.limit(),
    }))
}

/// Creates a question owned by the caller.
///
/// * Checks the option/answer shape for the question type.
/// * Enforces the per-user question quota.
/// * Sanitizes content and explanation.
pub async fn create_question(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    check_question_shape(
        payload.question_type,
        payload.options.as_deref(),
        &payload.answer,
    )?;

    let existing = store.count_questions(user_id).await?;
    if existing >= config.max_questions_per_user {
        return Err(AppError::quota_exceeded(
            "questions",
            config.max_questions_per_user,
        ));
    }

    let now = Utc::now();
    let question = Question {
        id: Uuid::new_v4(),
        user_id,
        question_type: payload.question_type,
        content: clean_html(&payload.content),
        options: payload
            .options
            .filter(|_| payload.question_type.is_choice())
            .map(Json),
        answer: Json(payload.answer),
        explanation: clean_optional(payload.explanation.as_deref()),
        tags: payload.tags.iter().map(|t| t.trim().to_string()).collect(),
        difficulty: payload.difficulty,
        points: payload.points,
        created_at: now,
        updated_at: now,
    };

    store.insert_question(&question).await?;
    tracing::info!(question_id = %question.id, "Question created");

    Ok(ApiResponse::created(question))
}

/// Questions on a live quiz are frozen so takers and reports see one version.
async fn ensure_not_live(store: &dyn QuizStore, id: Uuid) -> Result<(), AppError> {
    if store.question_in_published_paper(id).await? {
        return Err(AppError::Conflict(
            "Question is used by a published paper; archive the paper first".to_string(),
        ));
    }
    Ok(())
}

pub async fn get_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let question = store
        .get_question(claims.user_id()?, id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(ApiResponse::ok(question))
}

/// Updates a question. Fields are optional; the merged question is re-checked.
pub async fn update_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut question = store
        .get_question(user_id, id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if payload.is_empty() {
        return Ok(ApiResponse::ok(question));
    }
    ensure_not_live(store.as_ref(), id).await?;

    if let Some(tags) = &payload.tags {
        validate_tags(tags).map_err(|_| {
            AppError::validation("Tags must be 1 to 30 characters, at most 20 per question")
        })?;
    }

    if let Some(question_type) = payload.question_type {
        question.question_type = question_type;
    }
    if let Some(content) = payload.content {
        question.content = clean_html(&content);
    }
    if let Some(options) = payload.options {
        question.options = Some(Json(options));
    }
    if let Some(answer) = payload.answer {
        question.answer = Json(answer);
    }
    if let Some(explanation) = payload.explanation {
        question.explanation = clean_optional(Some(&explanation));
    }
    if let Some(tags) = payload.tags {
        question.tags = tags.iter().map(|t| t.trim().to_string()).collect();
    }
    if let Some(difficulty) = payload.difficulty {
        question.difficulty = difficulty;
    }
    if let Some(points) = payload.points {
        question.points = points;
    }
    if !question.question_type.is_choice() {
        question.options = None;
    }

    check_question_shape(
        question.question_type,
        question.options.as_ref().map(|o| o.0.as_slice()),
        &question.answer,
    )?;

    question.updated_at = Utc::now();
    if !store.update_question(&question).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(ApiResponse::ok(question))
}

pub async fn delete_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    if store.get_question(user_id, id).await?.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    ensure_not_live(store.as_ref(), id).await?;

    if !store.delete_question(user_id, id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question_id = %id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}
