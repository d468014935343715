#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use uuid::Uuid;

use classroom::router::init_router;
use classroom::state::AppState;
use classroom_admission::{
    DecisionError, DecisionService, LocalDecisionService, Policy, RequestDetails, Verdict,
};
use classroom_auth::create_access_token;
use classroom_config::AppConfig;
use classroom_core::Role;
use classroom_db::lazy_db_pool;

pub const FRONTEND_URL: &str = "http://localhost:5173";

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Configuration with test defaults, overridden by `overrides`.
pub fn app_config(overrides: &[(&'static str, &'static str)]) -> AppConfig {
    let mut env: HashMap<&str, &str> = HashMap::from([
        ("FRONTEND_URL", FRONTEND_URL),
        ("APP_ENV", "development"),
        ("DATABASE_URL", "postgres://classroom@127.0.0.1:1/unused"),
        ("JWT_SECRET", "integration-test-secret-with-enough-length"),
    ]);
    env.extend(overrides.iter().copied());
    AppConfig::from_lookup(&env).unwrap()
}

/// App over a pool that never connects, for tests that stay out of handlers
/// touching the database.
pub fn lazy_app(config: &AppConfig, decision: Arc<dyn DecisionService>) -> Router {
    let db = lazy_db_pool(&config.database).unwrap();
    init_router(AppState::new(db, config, decision))
}

/// App over a real pool with admission gates bypassed.
pub fn db_app(pool: PgPool) -> (Router, AppConfig) {
    let config = app_config(&[("APP_ENV", "test")]);
    let decision = Arc::new(LocalDecisionService::default());
    let app = init_router(AppState::new(pool, &config, decision));
    (app, config)
}

pub fn token_for(config: &AppConfig, role: Role) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let email = format!("{}@test.com", role.as_str());
    let issued = create_access_token(user_id, &email, role, &config.jwt).unwrap();
    (user_id, issued.token)
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn generate_unique_code() -> String {
    format!("S{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

/// `GET uri` from a regular browser.
pub fn browser_get(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", BROWSER_UA)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", BROWSER_UA);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// One recorded `evaluate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub max_count: u32,
    pub subject: Option<String>,
}

/// Returns a fixed verdict and records every call.
pub struct ScriptedDecision {
    verdict: Verdict,
    calls: Mutex<Vec<Evaluation>>,
}

impl ScriptedDecision {
    pub fn new(verdict: Verdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Evaluation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionService for ScriptedDecision {
    async fn evaluate(
        &self,
        policy: &Policy,
        request: &RequestDetails,
    ) -> Result<Verdict, DecisionError> {
        self.calls.lock().unwrap().push(Evaluation {
            max_count: policy.max_count().get(),
            subject: request.subject.clone(),
        });
        Ok(self.verdict)
    }
}

/// Always fails.
pub struct FailingDecision;

#[async_trait]
impl DecisionService for FailingDecision {
    async fn evaluate(
        &self,
        _policy: &Policy,
        _request: &RequestDetails,
    ) -> Result<Verdict, DecisionError> {
        Err(DecisionError::Unavailable("connection refused".to_string()))
    }
}

/// Allows, but only after a delay.
pub struct SlowDecision(pub Duration);

#[async_trait]
impl DecisionService for SlowDecision {
    async fn evaluate(
        &self,
        _policy: &Policy,
        _request: &RequestDetails,
    ) -> Result<Verdict, DecisionError> {
        tokio::time::sleep(self.0).await;
        Ok(Verdict::Allow)
    }
}
