/*!
 * Integration tests for the JSON API under /api/
 */

use axum::http::{header, StatusCode};
use serde_json::json;

use kikuyu_translate::app_config::RateLimitSpec;
use kikuyu_translate::database::models::{Difficulty, NewPrompt, PromptStatus, SourceType};

use crate::common::{self, TestApp};

fn offline_app() -> TestApp {
    TestApp::with_config(common::test_config(), None)
}

#[tokio::test]
async fn test_apiRateLimit_afterLimit_shouldRejectWithRetryAfter() {
    let mut config = common::test_config();
    config.limits.api_rate_limit = RateLimitSpec { requests: 2, window_secs: 3600 };
    let app = TestApp::with_config(config, None);

    let first = app.get("/api/categories", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.headers["x-ratelimit-remaining"], "1");
    assert_eq!(app.get("/api/categories", None).await.status, StatusCode::OK);

    let blocked = app.get("/api/platform-stats", None).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.headers.contains_key(header::RETRY_AFTER));
    assert_eq!(blocked.json["error"], true);

    // Routes outside /api/ are not limited
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_nextPrompt_withCategory_shouldPreferIt() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Lock the gate tonight."]).await.unwrap();
    app.repo
        .insert_prompt(&NewPrompt::new(
            "It is raining heavily in the hills.",
            "weather",
            SourceType::Manual,
            Difficulty::Basic,
        ))
        .await
        .unwrap();

    let response = app.get("/api/next-prompt?category=weather", None).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["category"], "weather");
    assert_eq!(response.json["difficulty_level"], "basic");
    assert_eq!(response.json["selection_strategy"], "user_preference");
}

#[tokio::test]
async fn test_nextPrompt_shouldNeverRepeatTranslatedPrompt() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Fetch firewood from the forest.", "The kettle is boiling."])
        .await
        .unwrap();

    let first = app.get("/api/next-prompt", None).await;
    let cookie = first.cookie("kikuyu_session").unwrap();
    let translated_id = first.json["prompt_id"].as_i64().unwrap();
    assert_eq!(first.json["selection_strategy"], "onboarding");
    app.post_json(
        "/translate",
        json!({ "prompt_id": translated_id, "kikuyu_text": "Rehe ngũ kuuma mũtitũ" }),
        Some(&cookie),
    )
    .await;

    app.state.cache.reset().await.unwrap();

    let second = app.get("/api/next-prompt", Some(&cookie)).await;
    assert_eq!(second.status, StatusCode::OK, "{}", second.text);
    assert_ne!(second.json["prompt_id"].as_i64().unwrap(), translated_id);

    let exhausted = app.get("/api/next-prompt", Some(&cookie)).await;
    assert_eq!(exhausted.status, StatusCode::NOT_FOUND);

    let newcomer = app.get("/api/next-prompt", None).await;
    assert_eq!(newcomer.json["prompt_id"].as_i64().unwrap(), translated_id);
}

#[tokio::test]
async fn test_skipPrompt_shouldServeAnotherAndReleaseSkipped() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Wash the cups please.", "The baby is asleep now."])
        .await
        .unwrap();

    let first = app.get("/api/next-prompt", None).await;
    let cookie = first.cookie("kikuyu_session").unwrap();
    let skipped_id = first.json["prompt_id"].as_i64().unwrap();

    let next = app
        .post_json("/api/skip-prompt", json!({ "prompt_id": skipped_id }), Some(&cookie))
        .await;

    assert_eq!(next.status, StatusCode::OK, "{}", next.text);
    assert_eq!(next.json["message"], "Prompt skipped successfully");
    assert_ne!(next.json["prompt_id"].as_i64().unwrap(), skipped_id);
    let skipped = app.repo.get_prompt(skipped_id).await.unwrap().unwrap();
    assert_eq!(skipped.status, PromptStatus::Available);
}

#[tokio::test]
async fn test_skipPrompt_withLastPrompt_shouldReleaseAndReportNone() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Count the sheep in the pen."]).await.unwrap();

    let first = app.get("/api/next-prompt", None).await;
    let cookie = first.cookie("kikuyu_session").unwrap();
    let skipped_id = first.json["prompt_id"].as_i64().unwrap();

    let stranger = app
        .post_json("/api/skip-prompt", json!({ "prompt_id": skipped_id }), None)
        .await;
    assert_eq!(stranger.status, StatusCode::CONFLICT);

    let response = app
        .post_json("/api/skip-prompt", json!({ "prompt_id": skipped_id }), Some(&cookie))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json["message"], "No more prompts available");
    assert_eq!(app.repo.prompt_counts().await.unwrap().available, 1);

    let missing = app.post_json("/api/skip-prompt", json!({}), None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_userProgress_shouldCountSessionTranslations() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Carry the water to the house."]).await.unwrap();

    let served = app.get("/api/next-prompt", None).await;
    let cookie = served.cookie("kikuyu_session").unwrap();
    let prompt_id = served.json["prompt_id"].as_i64().unwrap();
    app.post_json(
        "/translate",
        json!({ "prompt_id": prompt_id, "kikuyu_text": "Kuua maaĩ ũtware nyũmba" }),
        Some(&cookie),
    )
    .await;

    let progress = app.get("/api/user-progress", Some(&cookie)).await;
    assert_eq!(progress.status, StatusCode::OK);
    assert_eq!(progress.json["total_translations"], 1);
    assert_eq!(progress.json["approved_translations"], 0);
    assert_eq!(progress.json["categories"]["general"], 1);

    let stranger = app.get("/api/user-progress", None).await;
    assert_eq!(stranger.json["total_translations"], 0);
}

#[tokio::test]
async fn test_categoriesAndPlatformStats_shouldDescribeCorpus() {
    let app = offline_app();
    common::seed_prompts(&app.repo, &["Light the lamp, it is dark."]).await.unwrap();

    let categories = app.get("/api/categories", None).await;
    assert_eq!(categories.json["total_categories"], 1);
    assert_eq!(categories.json["categories"][0]["name"], "general");
    assert_eq!(categories.json["categories"][0]["coverage_percentage"], 0.0);

    let platform = app.get("/api/platform-stats", None).await;
    assert_eq!(platform.status, StatusCode::OK);
    assert_eq!(platform.json["total_translations"], 0);
    assert_eq!(platform.json["community_contributions"], 0);
}
