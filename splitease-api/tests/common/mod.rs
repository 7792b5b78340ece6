//! Common test utilities for integration tests
//!
//! Tests drive the full router with `tower::ServiceExt::oneshot` against a
//! real PostgreSQL database named by `DATABASE_URL`. Without it every test
//! returns early.
//!
//! Users are registered through the API with random emails, so tests can run
//! against a shared database without cleanup.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rand::Rng;
use serde_json::{json, Value};
use splitease_api::app::{build_router, AppState};
use splitease_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, NotificationConfig};
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Router plus the pool behind it
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

/// A registered user and their token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub token: String,
}

fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiration_hours: 2,
        },
        notifications: NotificationConfig {
            poll_seconds: 1,
            dedup_minutes: 5,
        },
    }
}

impl TestContext {
    /// Connects and migrates, or returns None when `DATABASE_URL` is unset.
    pub async fn new() -> Option<Self> {
        dotenvy::dotenv().ok();
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL not set, skipping integration test");
                return None;
            }
        };

        let db = PgPool::connect(&url).await.expect("connect to test database");
        splitease_shared::db::migrations::run_migrations(&db)
            .await
            .expect("run migrations");

        let app = build_router(AppState::new(db.clone(), test_config(url)));

        Some(Self { db, app })
    }

    /// Sends a request and returns the status and the JSON body (Null when
    /// the body is empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&user.token), body).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None)
            .await
    }

    /// Registers a user with a random email through the API.
    pub async fn register(&self, name: &str) -> TestUser {
        let suffix: u64 = rand::thread_rng().gen();
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}-{}@example.com", name.to_lowercase(), suffix),
                    "password": "viaje2024",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            name: name.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a group as `owner` and returns its JSON.
    pub async fn create_group(&self, owner: &TestUser, name: &str) -> Value {
        let (status, body) = self
            .post("/groups", owner, json!({ "name": name, "description": "test" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create group failed: {}", body);
        body
    }

    /// Joins `group` as `user` and asserts success.
    pub async fn join(&self, user: &TestUser, group: &Value) {
        let (status, body) = self
            .post(
                "/groups/join",
                user,
                json!({ "invitationCode": group["codigo_invitacion"] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "join failed: {}", body);
    }
}

pub fn group_id(group: &Value) -> i64 {
    group["id_grupo"].as_i64().unwrap()
}
