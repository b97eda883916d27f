// tests/feedback_tests.rs

mod common;

use common::{admin_token, data, error, spawn_app, user_token};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn feedback_review_flow() {
    let app = spawn_app().await;

    // Anyone may submit
    let response = app
        .client
        .post(app.url("/api/feedback"))
        .json(&json!({
            "type": "bug",
            "title": "Timer froze",
            "content": "Stopped at <i>00:10</i><script>x</script>",
            "rating": 2
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let id = data(response).await["id"].as_str().unwrap().to_string();

    // Regular users cannot list it
    let response = app
        .client
        .get(app.url("/api/admin/feedback"))
        .bearer_auth(user_token(Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    assert_eq!(error(response).await["code"], "PERMISSION_DENIED");

    // Admin lists pending feedback
    let admin = admin_token();
    let response = app
        .client
        .get(app.url("/api/admin/feedback?status=pending"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let items = data(response).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["content"], "Stopped at <i>00:10</i>");

    // Admin resolves it
    let response = app
        .client
        .put(app.url(&format!("/api/admin/feedback/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "resolved", "admin_response": "Fixed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated = data(response).await;
    assert_eq!(updated["status"], "resolved");
    assert_eq!(updated["admin_response"], "Fixed");

    let response = app
        .client
        .get(app.url("/api/admin/feedback?status=pending"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(data(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feedback_rating_out_of_range() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/feedback"))
        .json(&json!({
            "type": "feature",
            "title": "Dark mode",
            "content": "Please",
            "rating": 9
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn admin_routes_need_a_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/admin/feedback"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
