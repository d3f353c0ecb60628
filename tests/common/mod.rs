#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use refined_crm::app::{router, AppState};
use refined_crm::authz::Role;
use refined_crm::create_app;
use refined_crm::jwt::JwtConfig;
use refined_crm::rate_limit::{RateLimitConfig, RateLimits};
use refined_crm::routes::auth::insert_user;

pub const TEST_SECRET: &str = "test-secret";

/// A router on a fresh temp-file database. Keep it alive for the whole test;
/// dropping it removes the database.
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    jwt: JwtConfig,
    _dir: TempDir,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create tempdir")?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;

        let migrator =
            sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
                .await?;
        migrator.run(&pool).await?;

        std::env::set_var("JWT_SECRET", TEST_SECRET);
        // Every request from `oneshot` shares one client bucket.
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let jwt = JwtConfig::from_env()?;
        let app = create_app(pool.clone()).await?;

        Ok(Self { app, pool, jwt, _dir: dir })
    }

    /// A second router over the same database with its own rate limits.
    pub async fn with_rate_limits(&self, config: RateLimitConfig) -> Result<Router> {
        let state = AppState::new(self.pool.clone(), JwtConfig::from_env()?, RateLimits::new(config)?).await?;
        Ok(router(state))
    }

    /// Insert a user with `role` directly and mint a token for them.
    pub async fn user(&self, name: &str, role: Role) -> Result<TestUser> {
        let email = format!("{}-{}@example.com", name.to_lowercase().replace(' ', "."), Uuid::new_v4().simple());
        let user = insert_user(&self.pool, name, &email, "password123", role).await?;
        let token = self.jwt.encode(user.id, role)?;
        Ok(TestUser { id: user.id, token })
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body from {method} {uri}"))?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> Result<(StatusCode, Value)> {
        self.request("GET", uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> Result<(StatusCode, Value)> {
        self.request("POST", uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> Result<(StatusCode, Value)> {
        self.request("PUT", uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> Result<(StatusCode, Value)> {
        self.request("DELETE", uri, Some(&user.token), None).await
    }

    /// Create a company as `creator` and return its id.
    pub async fn company(&self, creator: &TestUser, body: Value) -> Result<String> {
        let (status, company) = self.post("/companies", creator, body).await?;
        assert_eq!(status, StatusCode::CREATED, "company creation failed: {company}");
        id_of(&company)
    }

    pub async fn notifications_of(&self, user_id: Uuid) -> Result<Vec<String>> {
        let messages = sqlx::query_scalar("SELECT message FROM notifications WHERE user_id = ? ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }
}

pub fn id_of(value: &Value) -> Result<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("response has no id: {value}"))
}
