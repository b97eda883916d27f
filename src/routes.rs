// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    handlers::{feedback, health, not_found, papers, questions, quiz, reports},
    response::envelope_middleware,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Creator routes (questions, papers, answers) require a bearer token.
/// * Quiz taking and feedback submission are public.
/// * Feedback review requires an admin.
/// * Every JSON body leaves through `envelope_middleware`.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let question_routes = Router::new()
        .route(
            "/",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let paper_routes = Router::new()
        .route("/", get(papers::list_papers).post(papers::create_paper))
        .route(
            "/{id}",
            get(papers::get_paper)
                .put(papers::update_paper)
                .delete(papers::delete_paper),
        )
        .route("/{id}/publish", post(papers::publish_paper))
        .route("/{id}/archive", post(papers::archive_paper))
        .route("/{id}/answers", get(reports::list_paper_answers))
        .route("/{id}/report", get(reports::paper_report))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let answer_routes = Router::new()
        .route("/{id}", get(reports::get_answer))
        .route("/{id}/grade", put(reports::grade_answer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let quiz_routes = Router::new()
        .route("/", get(quiz::get_quiz))
        .route("/submit", post(quiz::submit_quiz));

    let admin_routes = Router::new()
        .route("/feedback", get(feedback::list_feedback))
        .route("/feedback/{id}", put(feedback::update_feedback))
        // Auth runs first, then the admin check
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/questions", question_routes)
        .nest("/api/papers", paper_routes)
        .nest("/api/answers", answer_routes)
        .nest("/api/quiz", quiz_routes)
        .route("/api/feedback", post(feedback::create_feedback))
        .nest("/api/admin", admin_routes)
        .fallback(not_found)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(envelope_middleware))
        .with_state(state)
}

/// Wraps the router with per-IP rate limiting.
///
/// `rate_limit_per_second` requests replenish each second, up to
/// `rate_limit_burst`. Returns `None` when either is zero.
///
/// The limiter keys on the peer address, so the app must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn with_rate_limit(router: Router, config: &Config) -> Option<Router> {
    if config.rate_limit_per_second == 0 {
        return None;
    }
    // The governor takes the interval between replenished requests.
    let replenish_ms = (1000 / config.rate_limit_per_second).max(1);

    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(config.rate_limit_burst)
        .finish()?;

    Some(
        router
            .layer(GovernorLayer::new(Arc::new(governor_conf)))
            // Rejections from the limiter carry no envelope yet.
            .layer(middleware::from_fn(envelope_middleware)),
    )
}
