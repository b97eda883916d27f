// src/handlers/papers.rs

use std::collections::HashSet;

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    extract::{PathParam, QueryParams, ValidatedJson},
    models::{
        paper::{
            CreatePaperRequest, Paper, PaperDetail, PaperListParams, PaperStatus,
            UpdatePaperRequest,
        },
        question::Question,
    },
    response::ApiResponse,
    store::{DynStore, QuizStore},
    utils::{jwt::Claims, quiz_code::generate_quiz_code},
};

/// Attempts at finding a free quiz code before giving up.
const QUIZ_CODE_ATTEMPTS: usize = 10;

/// Resolves `ids` to the owner's questions, in order.
/// Duplicates and ids the owner cannot use are validation errors.
pub(crate) async fn load_owned_questions(
    store: &dyn QuizStore,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Question>, AppError> {
    let mut seen = HashSet::new();
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation {
            message: "Paper lists a question more than once".to_string(),
            details: Some(json!({ "question_ids": [dup] })),
        });
    }

    let questions = store.get_questions(ids).await?;
    let missing: Vec<&Uuid> = ids
        .iter()
        .filter(|id| !questions.iter().any(|q| q.id == **id && q.user_id == user_id))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation {
            message: "Some questions do not exist".to_string(),
            details: Some(json!({ "question_ids": missing })),
        });
    }

    Ok(questions)
}

pub(crate) fn total_points(questions: &[Question]) -> i32 {
    questions.iter().map(|q| q.points).sum()
}

pub(crate) async fn owned_paper(store: &dyn QuizStore, user_id: Uuid, id: Uuid) -> Result<Paper, AppError> {
    store
        .get_paper(user_id, id)
        .await?
        .ok_or(AppError::NotFound("Paper not found".to_string()))
}

fn ensure_transition(paper: &Paper, next: PaperStatus) -> Result<(), AppError> {
    if paper.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidPaperState(format!(
            "Cannot move paper from {} to {}",
            paper.status.as_str(),
            next.as_str()
        )))
    }
}

pub async fn list_papers(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    QueryParams(params): QueryParams<PaperListParams>,
) -> Result<impl IntoResponse, AppError> {
    let papers = store.list_papers(claims.user_id()?, params.status).await?;
    Ok(ApiResponse::ok(papers))
}

/// Creates a draft paper.
///
/// Enforces the per-user paper quota and checks that every referenced
/// question belongs to the caller.
pub async fn create_paper(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<CreatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    if store.count_papers(user_id).await? >= config.max_papers_per_user {
        return Err(AppError::quota_exceeded("papers", config.max_papers_per_user));
    }

    load_owned_questions(store.as_ref(), user_id, &payload.question_ids).await?;

    let now = Utc::now();
    let paper = Paper {
        id: Uuid::new_v4(),
        user_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        question_ids: payload.question_ids,
        settings: Json(payload.settings),
        status: PaperStatus::Draft,
        quiz_code: None,
        created_at: now,
        updated_at: now,
    };

    store.insert_paper(&paper).await?;
    tracing::info!(paper_id = %paper.id, "Paper created");

    Ok(ApiResponse::created(paper))
}

/// Returns the paper with its questions and total score.
pub async fn get_paper(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let paper = owned_paper(store.as_ref(), claims.user_id()?, id).await?;
    let questions = store.get_questions(&paper.question_ids).await?;
    let total_score = total_points(&questions);

    Ok(ApiResponse::ok(PaperDetail {
        paper,
        questions,
        total_score,
    }))
}

/// Updates a draft paper. Published and archived papers are read-only.
pub async fn update_paper(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut paper = owned_paper(store.as_ref(), user_id, id).await?;

    if paper.status != PaperStatus::Draft {
        return Err(AppError::InvalidPaperState(format!(
            "Only draft papers can be edited; this paper is {}",
            paper.status.as_str()
        )));
    }

    if let Some(settings) = &payload.settings {
        settings.validate()?;
    }

    if let Some(question_ids) = payload.question_ids {
        load_owned_questions(store.as_ref(), user_id, &question_ids).await?;
        paper.question_ids = question_ids;
    }
    if let Some(title) = payload.title {
        paper.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        paper.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if let Some(settings) = payload.settings {
        paper.settings = Json(settings);
    }

    paper.updated_at = Utc::now();
    if !store.update_paper(&paper).await? {
        return Err(AppError::NotFound("Paper not found".to_string()));
    }

    Ok(ApiResponse::ok(paper))
}

/// Deletes a paper and its submissions.
pub async fn delete_paper(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_paper(claims.user_id()?, id).await? {
        return Err(AppError::NotFound("Paper not found".to_string()));
    }

    tracing::info!(paper_id = %id, "Paper deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Publishes a draft paper and issues its quiz code.
///
/// Codes are drawn until one is not held by another published paper; the
/// unique index on published codes catches a concurrent winner.
pub async fn publish_paper(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut paper = owned_paper(store.as_ref(), user_id, id).await?;

    ensure_transition(&paper, PaperStatus::Published)?;

    if paper.question_ids.is_empty() {
        return Err(AppError::validation(
            "A paper needs at least one question before publishing",
        ));
    }
    // Questions may have been deleted since the paper was saved.
    load_owned_questions(store.as_ref(), user_id, &paper.question_ids).await?;

    let mut code = None;
    for _ in 0..QUIZ_CODE_ATTEMPTS {
        let candidate = generate_quiz_code();
        if !store.quiz_code_in_use(&candidate).await? {
            code = Some(candidate);
            break;
        }
        tracing::debug!(code = %candidate, "Quiz code collision, retrying");
    }
    let code = code.ok_or_else(|| {
        AppError::ServiceUnavailable("Could not allocate a quiz code, try again".to_string())
    })?;

    paper.status = PaperStatus::Published;
    paper.quiz_code = Some(code);
    paper.updated_at = Utc::now();
    store.update_paper(&paper).await?;

    tracing::info!(paper_id = %paper.id, quiz_code = ?paper.quiz_code, "Paper published");
    Ok(ApiResponse::ok(paper))
}

/// Archives a paper. Its quiz code stops resolving.
pub async fn archive_paper(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut paper = owned_paper(store.as_ref(), claims.user_id()?, id).await?;

    ensure_transition(&paper, PaperStatus::Archived)?;

    paper.status = PaperStatus::Archived;
    paper.updated_at = Utc::now();
    store.update_paper(&paper).await?;

    tracing::info!(paper_id = %paper.id, "Paper archived");
    Ok(ApiResponse::ok(paper))
}
