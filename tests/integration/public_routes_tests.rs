/*!
 * Integration tests for the contributor-facing routes
 */

use axum::http::StatusCode;
use serde_json::json;

use kikuyu_translate::database::models::PromptStatus;
use kikuyu_translate::providers::MockProvider;

use crate::common::{self, TestApp};

#[tokio::test]
async fn test_health_withWorkingDatabase_shouldReportHealthy() {
    let app = TestApp::new();

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["status"], "healthy");
    assert_eq!(response.json["database"], "connected");
    assert_eq!(response.json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_translateFlow_shouldServeStoreAndRejectDuplicates() {
    let app = TestApp::new();

    let served = app.get("/translate", None).await;
    assert_eq!(served.status, StatusCode::OK, "{}", served.text);
    let cookie = served.cookie("kikuyu_session").expect("new session cookie");
    let prompt_id = served.json["prompt"]["prompt_id"].as_i64().unwrap();
    assert!(!served.json["prompt"]["text"].as_str().unwrap().is_empty());

    let body = json!({ "prompt_id": prompt_id, "kikuyu_text": "Rũciinĩ  mwega" });
    let created = app.post_json("/translate", body.clone(), Some(&cookie)).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.json["success"], true);
    assert!(created.cookie("kikuyu_session").is_none());

    let stored_id = created.json["translation_id"].as_i64().unwrap();
    let stored = app.repo.get_translation(stored_id).await.unwrap().unwrap();
    assert_eq!(stored.kikuyu_text, "Rũciinĩ mwega");

    let duplicate = app
        .post_json(
            "/translate",
            json!({ "prompt_id": prompt_id, "kikuyu_text": "rũciinĩ MWEGA" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.json["error"], true);

    let thanks = app.get("/thank-you", Some(&cookie)).await;
    assert_eq!(thanks.json["translation_count"], 1);
}

#[tokio::test]
async fn test_translate_asFormPost_shouldBeAccepted() {
    let app = TestApp::with_config(common::test_config(), None);
    let ids = common::seed_prompts(&app.repo, &["The bus leaves at noon."]).await.unwrap();
    let served = app.get("/translate", None).await;
    let cookie = served.cookie("kikuyu_session").unwrap();
    assert_eq!(served.json["prompt"]["prompt_id"], ids[0]);

    let response = app
        .post_form(
            "/translate",
            &format!("prompt_id={}&kikuyu_text=Mbathi+ĩthiĩ+mũthenya", ids[0]),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
}

#[tokio::test]
async fn test_translate_withInvalidInput_shouldReturnBadRequest() {
    let app = TestApp::with_config(common::test_config(), None);
    let ids = common::seed_prompts(&app.repo, &["Open the window."]).await.unwrap();

    let missing = app
        .post_json("/translate", json!({ "kikuyu_text": "Hingũra ndirica" }), None)
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json["message"], "Prompt ID required");

    let symbols = app
        .post_json(
            "/translate",
            json!({ "prompt_id": ids[0], "kikuyu_text": "Hingũra <b>ndirica</b>" }),
            None,
        )
        .await;
    assert_eq!(symbols.status, StatusCode::BAD_REQUEST);
    assert!(symbols.json["message"].as_str().unwrap().contains("invalid character"));

    let unknown = app
        .post_json("/translate", json!({ "prompt_id": 9999, "kikuyu_text": "Hingũra" }), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_translate_overDailyLimit_shouldReturnTooManyRequests() {
    let mut config = common::test_config();
    config.limits.daily_submission_limit = Some(1);
    let app = TestApp::with_config(config, Some(MockProvider::working()));

    let first = app.get("/translate", None).await;
    let cookie = first.cookie("kikuyu_session").unwrap();
    let prompt_id = first.json["prompt"]["prompt_id"].as_i64().unwrap();
    let created = app
        .post_json(
            "/translate",
            json!({ "prompt_id": prompt_id, "kikuyu_text": "Nĩ wega mũno" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let blocked = app.get("/translate", Some(&cookie)).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.json["message"].as_str().unwrap().contains("1 translations per day"));
}

#[tokio::test]
async fn test_translate_withEmptyPoolAndNoSource_shouldReturnNotFound() {
    let app = TestApp::with_config(common::test_config(), None);

    let response = app.get("/translate", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json["message"], "No prompts available");
}

#[tokio::test]
async fn test_session_withTamperedCookie_shouldIssueFreshOne() {
    let app = TestApp::new();
    let first = app.get("/health", None).await;
    let cookie = first.cookie("kikuyu_session").unwrap();

    let kept = app.get("/health", Some(&cookie)).await;
    assert!(kept.cookie("kikuyu_session").is_none());

    let tampered = format!("{}0", cookie);
    let replaced = app.get("/health", Some(&tampered)).await;
    let fresh = replaced.cookie("kikuyu_session").expect("replacement cookie");
    assert_ne!(fresh, cookie);
}

#[tokio::test]
async fn test_skipPrompt_shouldReleaseKnownPrompt() {
    let app = TestApp::with_config(common::test_config(), None);
    common::seed_prompts(&app.repo, &["Sweep the compound today."]).await.unwrap();

    let served = app.get("/translate", None).await;
    let cookie = served.cookie("kikuyu_session").unwrap();
    let prompt_id = served.json["prompt"]["prompt_id"].as_i64().unwrap();
    assert_eq!(app.repo.prompt_counts().await.unwrap().available, 0);

    let skipped = app
        .post_json(&format!("/skip-prompt/{}", prompt_id), json!({}), Some(&cookie))
        .await;
    assert_eq!(skipped.status, StatusCode::OK);
    assert_eq!(app.repo.prompt_counts().await.unwrap().available, 1);

    let unknown = app.post_json("/skip-prompt/4242", json!({}), None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_skipPrompt_fromOtherSession_shouldKeepPromptWithHolder() {
    let app = TestApp::with_config(common::test_config(), None);
    common::seed_prompts(&app.repo, &["Milk the cow before sunrise."]).await.unwrap();

    let served = app.get("/translate", None).await;
    let holder = served.cookie("kikuyu_session").unwrap();
    let prompt_id = served.json["prompt"]["prompt_id"].as_i64().unwrap();
    let created = app
        .post_json(
            "/translate",
            json!({ "prompt_id": prompt_id, "kikuyu_text": "Kama ng'ombe riua rĩtanacharika" }),
            Some(&holder),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let stranger = app
        .post_json(&format!("/skip-prompt/{}", prompt_id), json!({}), None)
        .await;
    assert_eq!(stranger.status, StatusCode::CONFLICT);

    // A translated prompt stays with its translator
    let own = app
        .post_json(&format!("/skip-prompt/{}", prompt_id), json!({}), Some(&holder))
        .await;
    assert_eq!(own.status, StatusCode::CONFLICT);

    let next = app.get("/translate", None).await;
    assert_eq!(next.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_translate_forPromptNotServedToSession_shouldBeConflict() {
    let app = TestApp::with_config(common::test_config(), None);
    let ids = common::seed_prompts(&app.repo, &["Close the gate behind you."]).await.unwrap();
    let body = json!({ "prompt_id": ids[0], "kikuyu_text": "Hinga kĩhingo thutha waku" });

    let unserved = app.post_json("/translate", body.clone(), None).await;
    assert_eq!(unserved.status, StatusCode::CONFLICT);
    let prompt = app.repo.get_prompt(ids[0]).await.unwrap().unwrap();
    assert_eq!(prompt.status, PromptStatus::Available);

    app.get("/translate", None).await;
    let other = app.get("/health", None).await.cookie("kikuyu_session").unwrap();
    let stolen = app.post_json("/translate", body, Some(&other)).await;
    assert_eq!(stolen.status, StatusCode::CONFLICT);
    assert_eq!(app.repo.translation_counts().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_submitPrompt_shouldReturnReceiptOrValidationError() {
    let app = TestApp::new();

    let accepted = app
        .post_form(
            "/submit-prompt",
            "text=The+farmer+will+plant+maize+in+the+field.&difficulty_level=basic",
            None,
        )
        .await;
    assert_eq!(accepted.status, StatusCode::CREATED, "{}", accepted.text);
    assert_eq!(accepted.json["category"], "agriculture");
    assert!(accepted.json["submission_id"].as_i64().is_some());

    let repeated = app
        .post_json(
            "/submit-prompt",
            json!({ "text": "The farmer will plant maize in the field." }),
            None,
        )
        .await;
    assert_eq!(repeated.status, StatusCode::CONFLICT);

    let short = app.post_json("/submit-prompt", json!({ "text": "Too short" }), None).await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_shouldSummarizePlatform() {
    let app = TestApp::with_config(common::test_config(), None);
    common::seed_prompts(&app.repo, &["Feed the chickens in the morning."]).await.unwrap();

    let response = app.get("/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["stats"]["available_prompts"], 1);
    assert_eq!(response.json["cache_health"], "low");
}

#[tokio::test]
async fn test_unknownRouteAndMethod_shouldAnswerJson() {
    let app = TestApp::new();

    let missing = app.get("/nowhere", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json["error"], true);

    let wrong_method = app.post_json("/health", json!({}), None).await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong_method.json["message"], "Method not allowed");
}
