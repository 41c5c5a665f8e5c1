//! HTTP-level tests for the message board endpoints, driven through the
//! router with an in-memory database.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use train_api::{AppStateInner, build_router};
use train_db::Database;

fn app() -> Router {
    let db = Database::open_in_memory().expect("in-memory db");
    build_router(AppStateInner::new(db))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post_text(app: &Router, text: &str) -> Value {
    let (status, body) = send(app, "POST", "/messages", Some(json!({ "text": text }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn create_like_and_sort() {
    let app = app();

    let quiet = post_text(&app, "quiet one").await;
    let created = post_text(&app, "hello").await;
    assert_eq!(created["text"], "hello");
    assert_eq!(created["likes"], 0);
    assert_eq!(created["dislikes"], 0);
    assert!(created["createdAt"].is_string());

    let id = created["id"].as_str().unwrap();
    let (status, updated) = send(&app, "PATCH", "/messages", Some(json!({ "id": id, "action": "like" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["likes"], 1);
    assert_eq!(updated["dislikes"], 0);

    let (status, list) = send(&app, "GET", "/messages?sortBy=mostLiked", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list[0]["id"], created["id"]);
    assert_eq!(list[1]["id"], quiet["id"]);
}

#[tokio::test]
async fn empty_text_creates_nothing() {
    let app = app();
    post_text(&app, "existing").await;
    let (_, before) = send(&app, "GET", "/messages", None).await;

    for text in ["", "   "] {
        let (status, body) = send(&app, "POST", "/messages", Some(json!({ "text": text }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Message content is required");
    }

    let (status, body) = send(&app, "POST", "/messages", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message content is required");

    let (_, after) = send(&app, "GET", "/messages", None).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn stored_text_is_trimmed() {
    let app = app();
    let created = post_text(&app, "  breathe  ").await;
    assert_eq!(created["text"], "breathe");
}

#[tokio::test]
async fn reaction_validation() {
    let app = app();
    let created = post_text(&app, "hi").await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app, "PATCH", "/messages", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message ID and action are required");

    let (status, body) = send(&app, "PATCH", "/messages", Some(json!({ "id": id, "action": "love" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid action. Use \"like\" or \"dislike\"");

    let (status, body) = send(
        &app,
        "PATCH",
        "/messages",
        Some(json!({ "id": "missing", "action": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Message not found");
}

#[tokio::test]
async fn dislike_leaves_likes_alone() {
    let app = app();
    let created = post_text(&app, "hmm").await;
    let id = created["id"].as_str().unwrap();

    for expected in 1..=2 {
        let (status, body) = send(&app, "PATCH", "/messages", Some(json!({ "id": id, "action": "dislike" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dislikes"], expected);
        assert_eq!(body["likes"], 0);
    }
}

#[tokio::test]
async fn listing_is_capped_and_ordered() {
    let app = app();
    for i in 0..23 {
        post_text(&app, &format!("message {i}")).await;
    }

    for uri in ["/messages", "/messages?sortBy=newest", "/messages?sortBy=whatever"] {
        let (status, list) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 20);
        assert_eq!(list[0]["text"], "message 22");
        let stamps: Vec<DateTime<Utc>> = list
            .iter()
            .map(|m| m["createdAt"].as_str().unwrap().parse().unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_check() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
