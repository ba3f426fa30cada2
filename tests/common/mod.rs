/*!
 * Common test utilities for the kikuyu-translate test suite
 */

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use kikuyu_translate::app_config::Config;
use kikuyu_translate::database::models::{Difficulty, NewPrompt, SourceType};
use kikuyu_translate::database::Repository;
use kikuyu_translate::prompt_cache::{CacheSettings, PromptCache};
use kikuyu_translate::prompts::{DatasetSource, PromptGenerator};
use kikuyu_translate::providers::MockProvider;
use kikuyu_translate::server::{create_router, AppState, SharedState};

pub const ADMIN_PASSWORD: &str = "test-admin-password";

/// Development config with a small cache and no request delay
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.cache.min_cache_size = 3;
    config.cache.batch_size = 3;
    config.openrouter.daily_limit = 20;
    config.openrouter.request_delay_ms = 0;
    config.security.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.security.secret_key = Some("test-secret".to_string());
    config
}

/// Prompt cache backed by an optional mock LLM and an optional dataset
pub fn cache_for(
    config: &Config,
    repo: Repository,
    provider: Option<MockProvider>,
    dataset: Option<DatasetSource>,
) -> PromptCache {
    let generator = provider.map(|p| PromptGenerator::new(Arc::new(p), Duration::ZERO));
    PromptCache::new(repo, generator, dataset, CacheSettings::from_config(config))
}

/// Insert manual prompts and return their IDs
pub async fn seed_prompts(repo: &Repository, texts: &[&str]) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for text in texts {
        let id = repo
            .insert_prompt(&NewPrompt::new(*text, "general", SourceType::Manual, Difficulty::Basic))
            .await?
            .ok_or_else(|| anyhow::anyhow!("duplicate seed prompt: {}", text))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Response with the body decoded as JSON when possible
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub json: Value,
}

impl TestResponse {
    /// `name=value` part of the Set-Cookie header for `name`
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", name)))
            .map(str::to_string)
    }
}

/// Router plus direct handles on its state and database
pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub repo: Repository,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(), Some(MockProvider::working()))
    }

    pub fn with_config(config: Config, provider: Option<MockProvider>) -> Self {
        let repo = Repository::new_in_memory().expect("in-memory database");
        let cache = cache_for(&config, repo.clone(), provider, None);
        let state = AppState::with_cache(config, repo.clone(), cache).shared();
        Self {
            router: create_router(state.clone()),
            state,
            repo,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);

        TestResponse { status, headers, text, json }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("valid request")).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("valid request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("valid request"))
            .await
    }

    /// Log in and return the admin cookie pair
    pub async fn admin_cookie(&self) -> String {
        let response = self
            .post_json(
                "/admin/login",
                serde_json::json!({ "password": ADMIN_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.text);
        response.cookie("admin_session").expect("admin cookie")
    }
}
