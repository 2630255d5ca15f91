#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bootcamp_api::auth::PasswordService;
use bootcamp_api::config::AppConfig;
use bootcamp_api::database::{Collection, Document, MemoryStore, Store};
use bootcamp_api::state::AppState;

/// An in-process server over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub passwords: PasswordService,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::development())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(config, store.clone(), store)
    }

    /// Serves through `serving`, which is expected to wrap `store`.
    pub fn with_store(store: Arc<MemoryStore>, serving: Arc<dyn Store>) -> Self {
        Self::build(AppConfig::development(), store, serving)
    }

    fn build(config: AppConfig, store: Arc<MemoryStore>, serving: Arc<dyn Store>) -> Self {
        // Cheap hashing keeps the suite fast
        let passwords = PasswordService::with_cost(1024, 1);
        let state = AppState::new(serving, Arc::new(config)).with_passwords(passwords.clone());
        Self { router: bootcamp_api::app(state), store, passwords }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok(TestResponse { status, set_cookie, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, None, None).await
    }

    /// Registers through the API and returns the session token.
    pub async fn register(&self, name: &str, role: &str) -> Result<String> {
        let email = format!("{}@example.com", name.to_lowercase());
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "123456", "role": role })),
            )
            .await?;
        anyhow::ensure!(response.status == StatusCode::OK, "register failed: {}", response.body);
        token_of(&response)
    }

    /// Admins cannot self-register, so they are written straight into the store and then log in.
    pub async fn admin(&self) -> Result<String> {
        let mut doc = Document::new();
        doc.insert("name".into(), "Admin".into());
        doc.insert("email".into(), "admin@example.com".into());
        doc.insert("role".into(), "admin".into());
        doc.insert("password".into(), self.passwords.hash("123456")?.into());
        self.store.create(Collection::Users, doc).await?;

        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "admin@example.com", "password": "123456" })),
            )
            .await?;
        token_of(&response)
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str) -> Result<String> {
        let response = self
            .request(
                Method::POST,
                "/api/v1/bootcamps",
                Some(token),
                Some(json!({ "name": name, "description": format!("{} teaches full stack development", name) })),
            )
            .await?;
        anyhow::ensure!(response.status == StatusCode::CREATED, "create bootcamp failed: {}", response.body);
        id_of(&response.body["data"])
    }

    pub async fn create_course(&self, token: &str, bootcamp: &str, title: &str, tuition: u32) -> Result<String> {
        let response = self
            .request(
                Method::POST,
                &format!("/api/v1/bootcamps/{}/courses", bootcamp),
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "Learn the basics",
                    "weeks": "8",
                    "tuition": tuition,
                    "minimumSkill": "beginner"
                })),
            )
            .await?;
        anyhow::ensure!(response.status == StatusCode::CREATED, "create course failed: {}", response.body);
        id_of(&response.body["data"])
    }
}

pub fn token_of(response: &TestResponse) -> Result<String> {
    response.body["token"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("no token in {}", response.body))
}

pub fn id_of(doc: &Value) -> Result<String> {
    doc["id"].as_str().map(str::to_string).with_context(|| format!("no id in {}", doc))
}
