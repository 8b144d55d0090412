//! API integration tests
//!
//! Drive the full router in process against the in-memory storage.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use school_library_server::{
    api,
    config::AppConfig,
    models::{Book, Role, User, UserClaims},
    repository::memory::{MemoryStorage, Seed},
    AppState,
};

const SECRET: &str = "integration-test-secret";
const LIBRARIAN_ID: i32 = 1;
const STUDENT_ID: i32 = 2;
const OTHER_STUDENT_ID: i32 = 3;

fn user(id: i32, username: &str, role: Role) -> User {
    User {
        id,
        username: username.to_string(),
        first_name: None,
        last_name: None,
        email: None,
        role,
    }
}

fn users() -> Vec<User> {
    vec![
        user(LIBRARIAN_ID, "librarian", Role::Librarian),
        user(STUDENT_ID, "sam", Role::Student),
        user(OTHER_STUDENT_ID, "noor", Role::Student),
    ]
}

fn app() -> Router {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();

    let storage = MemoryStorage::with_seed(Seed {
        users: users(),
        books: vec![
            Book {
                id: 1,
                name: "Dune".to_string(),
                total_qty: 1,
                available_qty: 1,
            },
            Book {
                id: 2,
                name: "Emma".to_string(),
                total_qty: 3,
                available_qty: 3,
            },
        ],
        borrowed_books: vec![],
    })
    .expect("valid seed");

    api::router(AppState::new(config, Arc::new(storage)))
}

fn token_for(id: i32) -> String {
    let user = users()
        .into_iter()
        .find(|u| u.id == id)
        .expect("known user");
    UserClaims::new(&user, 1)
        .create_token(SECRET)
        .expect("Failed to create token")
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_get_current_user() {
    let app = app();
    let token = token_for(STUDENT_ID);

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "sam");
    assert_eq!(body["role"], "student");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_and_get_books() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["name"], "Dune");

    let (status, body) = send(&app, Method::GET, "/api/v1/books?name=EM&per_page=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["items"][0]["name"], "Emma");

    let (status, body) = send(&app, Method::GET, "/api/v1/books/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_qty"], 3);

    let (status, body) = send(&app, Method::GET, "/api/v1/books/99", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");

    let (status, _) = send(&app, Method::GET, "/api/v1/books?page=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_book() {
    let app = app();
    let librarian = token_for(LIBRARIAN_ID);
    let student = token_for(STUDENT_ID);
    let body = json!({ "name": "The Hobbit", "total_qty": 2 });

    let (status, _) = send(&app, Method::POST, "/api/v1/books", Some(&student), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, Method::POST, "/api/v1/books", Some(&librarian), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["available_qty"], 2);

    let (status, _) = send(&app, Method::POST, "/api/v1/books", Some(&librarian), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_only_librarians_borrow() {
    let app = app();
    let body = json!({ "book_id": 1, "student_id": STUDENT_ID });

    let (status, body_out) = send(&app, Method::POST, "/api/v1/borrowed-books/borrow", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body_out["error"], "NotAuthenticated");

    let student = token_for(STUDENT_ID);
    let (status, body_out) = send(&app, Method::POST, "/api/v1/borrowed-books/borrow", Some(&student), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body_out["error"], "NotAuthorized");

    let (_, book) = send(&app, Method::GET, "/api/v1/books/1", None, None).await;
    assert_eq!(book["available_qty"], 1);
}

#[tokio::test]
async fn test_borrow_renew_return_flow() {
    let app = app();
    let librarian = token_for(LIBRARIAN_ID);
    let borrow = "/api/v1/borrowed-books/borrow";

    // Lend the only copy
    let (status, body) = send(
        &app,
        Method::POST,
        borrow,
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": STUDENT_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["borrowed_book"]["is_renewed"], false);
    assert!(body["borrowed_book"]["return_date"].is_null());

    let (_, book) = send(&app, Method::GET, "/api/v1/books/1", None, None).await;
    assert_eq!(book["available_qty"], 0);

    // Nothing left for another student
    let (status, body) = send(
        &app,
        Method::POST,
        borrow,
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": OTHER_STUDENT_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BookNotAvailable");
    assert!(body["message"].as_str().unwrap_or_default().contains("Dune"));

    // Renew once
    let (status, body) = send(
        &app,
        Method::POST,
        borrow,
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": STUDENT_ID, "renew": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["borrowed_book"]["is_renewed"], true);

    // But not twice
    let (status, body) = send(
        &app,
        Method::POST,
        borrow,
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": STUDENT_ID, "renew": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyRenewed");

    // Return puts the copy back
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/borrowed-books/return",
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": STUDENT_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["borrowed_book"]["is_renewed"], false);
    assert!(body["borrowed_book"]["return_date"].is_string());

    let (_, book) = send(&app, Method::GET, "/api/v1/books/1", None, None).await;
    assert_eq!(book["available_qty"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/borrowed-books/return",
        Some(&librarian),
        Some(json!({ "book_id": 1, "student_id": STUDENT_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotBorrowed");
}

#[tokio::test]
async fn test_listings_by_role() {
    let app = app();
    let librarian = token_for(LIBRARIAN_ID);
    let student = token_for(STUDENT_ID);

    for (book_id, student_id) in [(1, STUDENT_ID), (2, STUDENT_ID), (2, OTHER_STUDENT_ID)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/borrowed-books/borrow",
            Some(&librarian),
            Some(json!({ "book_id": book_id, "student_id": student_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/api/v1/me/books", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (status, _) = send(&app, Method::GET, "/api/v1/me/books", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/v1/borrowed-books?book_id=2", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (status, _) = send(&app, Method::GET, "/api/v1/borrowed-books", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/borrowed-books/borrow"].is_object());
}
