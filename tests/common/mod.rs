// tests/common/mod.rs

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use quizflow::{
    config::{Config, StoreBackend},
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use serde_json::Value;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_for_integration_tests";
pub const ADMIN_EMAIL: &str = "admin@quizflow.io";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: TEST_SECRET.to_string(),
        jwt_audience: Some("authenticated".to_string()),
        rust_log: "error".to_string(),
        port: 0,
        store_backend: StoreBackend::Memory,
        cors_origins: vec![],
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        max_questions_per_user: 500,
        max_papers_per_user: 50,
        rate_limit_per_second: 10,
        rate_limit_burst: 30,
        log_dir: "logs".to_string(),
    }
}

/// Spawns the app on a random port against a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// Same as `spawn_app_with`, but behind the per-IP rate limiter the way
/// the binary serves it.
pub async fn spawn_rate_limited_app(config: Config) -> TestApp {
    let limits = config.clone();
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
    };
    let app = routes::with_rate_limit(routes::create_router(state), &limits)
        .expect("rate limits must be non-zero");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// Token for a regular creator account.
pub fn user_token(user_id: Uuid) -> String {
    sign_jwt(
        user_id,
        Some(&format!("{}@example.com", &user_id.to_string()[..8])),
        "authenticated",
        TEST_SECRET,
        600,
    )
    .unwrap()
}

pub fn admin_token() -> String {
    sign_jwt(Uuid::new_v4(), Some(ADMIN_EMAIL), "authenticated", TEST_SECRET, 600).unwrap()
}

/// Reads a response body and returns the envelope's `data`.
pub async fn data(response: reqwest::Response) -> Value {
    let body: Value = response.json().await.expect("Body is not JSON");
    assert_eq!(body["success"], true, "unexpected envelope: {body}");
    body["data"].clone()
}

/// Reads a response body and returns the envelope's `error`.
pub async fn error(response: reqwest::Response) -> Value {
    let body: Value = response.json().await.expect("Body is not JSON");
    assert_eq!(body["success"], false, "unexpected envelope: {body}");
    body["error"].clone()
}

/// Creates a single-choice question with the answer "B" and returns its id.
pub async fn create_choice_question(app: &TestApp, token: &str, points: i32) -> String {
    let response = app
        .client
        .post(app.url("/api/questions"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "type": "single",
            "content": "Pick B",
            "options": ["A", "B", "C"],
            "answer": "B",
            "points": points
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    data(response).await["id"].as_str().unwrap().to_string()
}
