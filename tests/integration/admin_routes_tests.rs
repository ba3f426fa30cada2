/*!
 * Integration tests for the admin panel
 */

use axum::http::{header, StatusCode};
use serde_json::json;

use kikuyu_translate::database::models::{NewTranslation, PromptStatus};
use kikuyu_translate::providers::MockProvider;

use crate::common::{self, TestApp};

/// Seed one served prompt with a pending translation, returning both IDs
async fn pending_translation(app: &TestApp) -> (i64, i64) {
    common::seed_prompts(&app.repo, &["Good night, sleep well."]).await.unwrap();
    let user = app.repo.get_or_create_user("contributor").await.unwrap();
    let prompt = app
        .repo
        .claim_next_prompt(&user.session_id, None)
        .await
        .unwrap()
        .unwrap();
    let translation = app
        .repo
        .create_translation(NewTranslation {
            prompt_id: prompt.id,
            user_id: user.id,
            kikuyu_text: "Ũtukũ mwega, ũkome wega.".to_string(),
            ip_address: None,
            user_agent: None,
        })
        .await
        .unwrap();
    (prompt.id, translation.id)
}

#[tokio::test]
async fn test_adminRoutes_withoutSession_shouldBeUnauthorized() {
    let app = TestApp::new();

    for path in ["/admin", "/admin/", "/admin/translations", "/admin/stats", "/admin/export"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(response.json["message"], "Admin login required");
    }

    let forged = app.get("/admin/", Some("admin_session=not-a-token")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_withWrongPassword_shouldBeUnauthorized() {
    let app = TestApp::new();

    let response = app
        .post_form("/admin/login", "password=guess", None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json["message"], "Invalid password");
    assert!(response.cookie("admin_session").is_none());
}

#[tokio::test]
async fn test_loginAndLogout_shouldOpenAndCloseSession() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let dashboard = app.get("/admin/", Some(&cookie)).await;
    assert_eq!(dashboard.status, StatusCode::OK, "{}", dashboard.text);
    assert!(dashboard.json["overview"].is_object());
    assert!(dashboard.json["cache"].is_object());
    assert_eq!(dashboard.json["pending_submissions"], 0);

    let logout = app.post_json("/admin/logout", json!({}), Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = app.get("/admin/", Some(&cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moderate_reject_shouldDeleteAndReleasePrompt() {
    let app = TestApp::with_config(common::test_config(), None);
    let (prompt_id, translation_id) = pending_translation(&app).await;
    let cookie = app.admin_cookie().await;

    let response = app
        .post_form(
            &format!("/admin/translation/{}/moderate", translation_id),
            "action=reject&notes=wrong+meaning",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["action"], "reject");
    assert_eq!(response.json["released_prompt_id"], prompt_id);
    assert!(app.repo.get_translation(translation_id).await.unwrap().is_none());
    let prompt = app.repo.get_prompt(prompt_id).await.unwrap().unwrap();
    assert_eq!(prompt.status, PromptStatus::Available);

    let audit = app.repo.admin_actions_for(translation_id).await.unwrap();
    assert_eq!(audit[0].admin_id, "admin");
    assert_eq!(audit[0].notes.as_deref(), Some("wrong meaning"));

    let again = app
        .post_json(
            &format!("/admin/translation/{}/moderate", translation_id),
            json!({ "action": "approve" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_moderate_withUnknownAction_shouldBeBadRequest() {
    let app = TestApp::with_config(common::test_config(), None);
    let (_prompt_id, translation_id) = pending_translation(&app).await;
    let cookie = app.admin_cookie().await;

    let response = app
        .post_json(
            &format!("/admin/translation/{}/moderate", translation_id),
            json!({ "action": "delete" }),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["message"], "Invalid action");
}

#[tokio::test]
async fn test_translations_shouldPaginateAndFilter() {
    let app = TestApp::with_config(common::test_config(), None);
    let (_prompt_id, translation_id) = pending_translation(&app).await;
    let cookie = app.admin_cookie().await;

    let pending = app.get("/admin/translations?status=pending", Some(&cookie)).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.json["total"], 1);
    assert_eq!(pending.json["total_pages"], 1);
    assert_eq!(pending.json["translations"][0]["id"], translation_id);

    let approved = app.get("/admin/translations?status=approved", Some(&cookie)).await;
    assert_eq!(approved.json["total"], 0);

    let invalid = app.get("/admin/translations?status=gone", Some(&cookie)).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_asCsv_shouldDownloadAttachment() {
    let app = TestApp::with_config(common::test_config(), None);
    pending_translation(&app).await;
    let cookie = app.admin_cookie().await;

    let response = app.get("/admin/export?format=csv&status=pending", Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"translations_pending.csv\""
    );
    assert!(response.text.starts_with("ID,English,Kikuyu,Status,Created At\r\n"));
    assert!(response.text.contains("\"Good night, sleep well.\""));

    let bad = app.get("/admin/export?format=xml", Some(&cookie)).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cacheRoutes_shouldRefillAndReportQuota() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let refill = app.post_json("/admin/refill-cache", json!({}), Some(&cookie)).await;
    assert_eq!(refill.status, StatusCode::OK, "{}", refill.text);
    assert_eq!(refill.json["success"], true);
    assert_eq!(refill.json["outcome"]["added"], 3);
    assert_eq!(refill.json["outcome"]["source"], "llm");

    let status = app.get("/admin/cache-status", Some(&cookie)).await;
    assert_eq!(status.json["cache"]["available"], 3);
    assert_eq!(status.json["cache"]["api_calls_today"], 3);
    assert_eq!(status.json["cache"]["health"], "healthy");
    assert_eq!(status.json["refill_in_progress"], false);

    let connection = app.post_json("/admin/test-connection", json!({}), Some(&cookie)).await;
    assert_eq!(connection.status, StatusCode::OK);
    assert_eq!(connection.json["success"], true);
}

#[tokio::test]
async fn test_testConnection_withFailingProvider_shouldBeUnavailable() {
    let app = TestApp::with_config(common::test_config(), Some(MockProvider::failing()));
    let cookie = app.admin_cookie().await;

    let response = app.post_json("/admin/test-connection", json!({}), Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json["message"].as_str().unwrap().starts_with("Connection test failed"));
}

#[tokio::test]
async fn test_submissionReview_shouldAddPromptToPool() {
    let app = TestApp::with_config(common::test_config(), None);
    let cookie = app.admin_cookie().await;
    let receipt = app
        .post_json(
            "/submit-prompt",
            json!({ "text": "My mother cooks beans for the family every evening." }),
            None,
        )
        .await;
    let submission_id = receipt.json["submission_id"].as_i64().unwrap();

    let listed = app.get("/admin/submissions?category=family", Some(&cookie)).await;
    assert_eq!(listed.json["count"], 1);

    let reviewed = app
        .post_json(
            &format!("/admin/submission/{}/review", submission_id),
            json!({ "action": "approve", "notes": "" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(reviewed.status, StatusCode::OK, "{}", reviewed.text);
    let prompt_id = reviewed.json["prompt_id"].as_i64().unwrap();
    assert!(app.repo.get_prompt(prompt_id).await.unwrap().is_some());

    let missing = app
        .post_json("/admin/submission/999/review", json!({ "action": "approve" }), Some(&cookie))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detailedStats_shouldIncludeDatabaseAndSubmissions() {
    let app = TestApp::with_config(common::test_config(), None);
    pending_translation(&app).await;
    let cookie = app.admin_cookie().await;

    let response = app.get("/admin/stats", Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["database"]["translation_count"], 1);
    assert_eq!(response.json["submissions"]["total_submissions"], 0);
    assert_eq!(response.json["overview"]["translations"]["pending"], 1);
    assert!(response.json["uptime_secs"].as_i64().unwrap() >= 0);
}
