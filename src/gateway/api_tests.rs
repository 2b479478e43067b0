//! HTTP API tests
//!
//! Drive the full router (middleware included) with `oneshot` against the
//! in-memory store.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use super::build_router;
use super::state::AppState;
use super::types::error_codes;
use crate::account::{Account, Currency};
use crate::store::{FailPoint, MemoryStore};
use crate::token::{JwtMaker, TokenMaker};

const KEY: &str = "12345678901234567890123456789012";

struct TestApp {
    store: MemoryStore,
    router: Router,
    maker: JwtMaker,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(JwtMaker::new(KEY).unwrap()),
            Duration::from_secs(60),
            Some(Duration::from_secs(5)),
        );
        Self {
            store,
            router: build_router(Arc::new(state)),
            maker: JwtMaker::new(KEY).unwrap(),
        }
    }

    fn token(&self, username: &str) -> String {
        self.maker
            .create_token(username, Duration::from_secs(60))
            .unwrap()
            .0
    }

    async fn account(&self, owner: &str, balance: i64, currency: Currency) -> Account {
        self.store
            .seed_account(owner, balance, currency)
            .await
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

fn new_user(username: &str) -> Value {
    json!({
        "username": username,
        "password": "secret123",
        "full_name": "Test User",
        "email": format!("{username}@example.com"),
    })
}

// ============================================================================
// System
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert!(body["data"]["timestamp_ms"].as_u64().unwrap() > 0);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_create_user() {
    let app = TestApp::new();

    let (status, body) = app.post("/users", None, new_user("alice")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("hashed_password").is_none());

    let (status, body) = app.post("/users", None, new_user("alice")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], error_codes::USER_EXISTS);
}

#[tokio::test]
async fn test_create_user_mixed_case_username() {
    let app = TestApp::new();

    let (status, body) = app.post("/users", None, new_user("Alice_01")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "Alice_01");
}

#[tokio::test]
async fn test_create_user_invalid_input() {
    let app = TestApp::new();

    let mut bad_email = new_user("bob");
    bad_email["email"] = json!("invalid-email");
    let (status, _) = app.post("/users", None, bad_email).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_name = new_user("bob");
    bad_name["username"] = json!("invalid-user#1");
    let (status, _) = app.post("/users", None, bad_name).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut short_pw = new_user("bob");
    short_pw["password"] = json!("123");
    let (status, _) = app.post("/users", None, short_pw).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post("/users", None, json!({"username": "bob"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], error_codes::INVALID_PARAMETER);
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new();
    app.post("/users", None, new_user("alice")).await;

    let (status, body) = app
        .post(
            "/users/login",
            None,
            json!({"username": "alice", "password": "secret123"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["username"], "alice");

    // The issued token opens private routes
    let (status, _) = app
        .get("/accounts?page_id=1&page_size=5", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/users/login",
            None,
            json!({"username": "alice", "password": "wrongpass"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/users/login",
            None,
            json!({"username": "nobody", "password": "secret123"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Auth middleware
// ============================================================================

#[tokio::test]
async fn test_auth_middleware_rejections() {
    let app = TestApp::new();
    let token = app.token("alice");

    let cases = [
        None,
        Some("".to_string()),
        Some(format!("Basic {token}")),
        Some(token.clone()),
        Some(format!("Bearer {token} extra")),
        Some("Bearer not.a.token".to_string()),
    ];

    for header_value in cases {
        let mut builder = Request::builder().method("GET").uri("/accounts/1");
        if let Some(v) = &header_value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (status, body) = app.send(builder.body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{header_value:?}");
        assert_ne!(body["code"], 0);
    }
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let app = TestApp::new();
    let other = JwtMaker::new("abcdefghijklmnopqrstuvwxyzabcdef").unwrap();
    let (token, _) = other
        .create_token("alice", Duration::from_secs(60))
        .unwrap();

    let (status, body) = app.get("/accounts/1", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::AUTH_FAILED);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_create_account() {
    let app = TestApp::new();
    app.post("/users", None, new_user("alice")).await;
    let token = app.token("alice");

    let (status, body) = app
        .post("/accounts", Some(&token), json!({"currency": "USD"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["owner"], "alice");
    assert_eq!(body["data"]["balance"], 0);
    assert_eq!(body["data"]["currency"], "USD");

    let (status, _) = app
        .post("/accounts", Some(&token), json!({"currency": "USD"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/accounts", Some(&token), json!({"currency": "XYZ"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Token for a user that does not exist violates the owner foreign key
    let ghost = app.token("ghost");
    let (status, _) = app
        .post("/accounts", Some(&ghost), json!({"currency": "EUR"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/accounts", None, json!({"currency": "EUR"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_account() {
    let app = TestApp::new();
    let account = app.account("alice", 100, Currency::Usd).await;
    let token = app.token("alice");

    let (status, body) = app
        .get(&format!("/accounts/{}", account.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let got: Account = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(got, account);

    let (status, _) = app
        .get(&format!("/accounts/{}", account.id), Some(&app.token("mallory")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/accounts/999", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/accounts/0", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/accounts/abc", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_accounts() {
    let app = TestApp::new();
    for currency in Currency::ALL {
        app.account("alice", 10, currency).await;
    }
    app.account("bob", 10, Currency::Usd).await;
    let token = app.token("alice");

    let (status, body) = app
        .get("/accounts?page_id=1&page_size=5", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let accounts: Vec<Account> = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(accounts.len(), 4);
    assert!(accounts.iter().all(|a| a.owner == "alice"));

    let (status, body) = app
        .get("/accounts?page_id=2&page_size=5", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    for query in [
        "page_id=0&page_size=5",
        "page_id=1&page_size=20",
        "page_id=1",
        "page_id=x&page_size=5",
    ] {
        let (status, _) = app.get(&format!("/accounts?{query}"), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
    }
}

// ============================================================================
// Transfers
// ============================================================================

fn transfer_body(from: i64, to: i64, amount: i64, currency: &str) -> Value {
    json!({
        "from_account_id": from,
        "to_account_id": to,
        "amount": amount,
        "currency": currency,
    })
}

#[tokio::test]
async fn test_transfer_ok() {
    let app = TestApp::new();
    let a = app.account("alice", 100, Currency::Usd).await;
    let b = app.account("bob", 50, Currency::Usd).await;
    let token = app.token("alice");

    let (status, body) = app
        .post("/transfers", Some(&token), transfer_body(a.id, b.id, 30, "USD"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["transfer"]["amount"], 30);
    assert_eq!(data["from_entry"]["amount"], -30);
    assert_eq!(data["to_entry"]["amount"], 30);
    assert_eq!(data["from_account"]["balance"], 70);
    assert_eq!(data["to_account"]["balance"], 80);

    assert_eq!(app.store.account(a.id).unwrap().balance, 70);
    assert_eq!(app.store.account(b.id).unwrap().balance, 80);
}

#[tokio::test]
async fn test_transfer_rejections_leave_ledger_unchanged() {
    let app = TestApp::new();
    let a = app.account("alice", 100, Currency::Usd).await;
    let b = app.account("bob", 50, Currency::Usd).await;
    let c = app.account("carol", 50, Currency::Eur).await;
    let token = app.token("alice");

    let cases = [
        // Foreign source account
        (
            app.token("bob"),
            transfer_body(a.id, b.id, 10, "USD"),
            StatusCode::UNAUTHORIZED,
        ),
        // Missing accounts
        (
            token.clone(),
            transfer_body(999, b.id, 10, "USD"),
            StatusCode::NOT_FOUND,
        ),
        (
            token.clone(),
            transfer_body(a.id, 999, 10, "USD"),
            StatusCode::NOT_FOUND,
        ),
        // Currency mismatch on either side
        (
            token.clone(),
            transfer_body(a.id, c.id, 10, "USD"),
            StatusCode::BAD_REQUEST,
        ),
        (
            token.clone(),
            transfer_body(a.id, b.id, 10, "EUR"),
            StatusCode::BAD_REQUEST,
        ),
        // Field rules
        (
            token.clone(),
            transfer_body(a.id, b.id, -5, "USD"),
            StatusCode::BAD_REQUEST,
        ),
        (
            token.clone(),
            transfer_body(a.id, b.id, 0, "USD"),
            StatusCode::BAD_REQUEST,
        ),
        (
            token.clone(),
            transfer_body(a.id, b.id, 10, "XYZ"),
            StatusCode::BAD_REQUEST,
        ),
        (
            token.clone(),
            transfer_body(a.id, a.id, 10, "USD"),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (token, body, expected) in cases {
        let (status, resp) = app.post("/transfers", Some(&token), body.clone()).await;
        assert_eq!(status, expected, "{body} -> {resp}");
    }

    assert_eq!(app.store.account(a.id).unwrap().balance, 100);
    assert_eq!(app.store.account(b.id).unwrap().balance, 50);
    assert!(app.store.transfers().is_empty());
    assert!(app.store.entries().is_empty());
}

#[tokio::test]
async fn test_transfer_storage_failure_is_500_and_rolled_back() {
    let app = TestApp::new();
    let a = app.account("alice", 100, Currency::Usd).await;
    let b = app.account("bob", 50, Currency::Usd).await;
    app.store.inject_failure(FailPoint::AddAccountBalance);

    let (status, body) = app
        .post(
            "/transfers",
            Some(&app.token("alice")),
            transfer_body(a.id, b.id, 30, "USD"),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], error_codes::INTERNAL_ERROR);

    assert_eq!(app.store.account(a.id).unwrap().balance, 100);
    assert!(app.store.transfers().is_empty());
}

#[tokio::test]
async fn test_get_transfer() {
    let app = TestApp::new();
    let a = app.account("alice", 100, Currency::Usd).await;
    let b = app.account("bob", 50, Currency::Usd).await;
    app.account("mallory", 0, Currency::Usd).await;

    let (_, body) = app
        .post(
            "/transfers",
            Some(&app.token("alice")),
            transfer_body(a.id, b.id, 30, "USD"),
        )
        .await;
    let id = body["data"]["transfer"]["id"].as_i64().unwrap();
    let uri = format!("/transfers/{id}");

    for owner in ["alice", "bob"] {
        let (status, body) = app.get(&uri, Some(&app.token(owner))).await;
        assert_eq!(status, StatusCode::OK, "{owner}");
        assert_eq!(body["data"]["id"], id);
    }

    let (status, _) = app.get(&uri, Some(&app.token("mallory"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/transfers/999", Some(&app.token("alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_docs_served() {
    let app = TestApp::new();
    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Simple Bank API");
}
