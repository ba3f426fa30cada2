/*!
 * Tests for moderation decisions and the export that follows them
 */

use kikuyu_translate::database::models::{NewTranslation, PromptStatus, TranslationStatus};
use kikuyu_translate::database::Repository;
use kikuyu_translate::export::{export_translations, ExportFormat};
use kikuyu_translate::moderation::{ModerationAction, ModerationService};
use serde_json::Value;

use crate::common;

/// Three served prompts, each with one pending translation
async fn moderated_corpus() -> (Repository, ModerationService, Vec<i64>) {
    let repo = Repository::new_in_memory().unwrap();
    common::seed_prompts(
        &repo,
        &[
            "Good evening, my friend.",
            "The cows are in the shed.",
            "Where is the nearest well?",
        ],
    )
    .await
    .unwrap();
    let user = repo.get_or_create_user("translator").await.unwrap();

    let mut translation_ids = Vec::new();
    for text in ["Hwaĩ-inĩ njega, mũrata.", "Ng'ombe irĩ gĩcegenĩ.", "Gĩthima kĩrĩa kĩrĩ hakuhĩ kĩrĩ kũ?"] {
        let prompt = repo.claim_next_prompt(&user.session_id, None).await.unwrap().unwrap();
        let stored = repo
            .create_translation(NewTranslation {
                prompt_id: prompt.id,
                user_id: user.id,
                kikuyu_text: text.to_string(),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();
        translation_ids.push(stored.id);
    }

    let moderation = ModerationService::new(repo.clone());
    (repo, moderation, translation_ids)
}

#[tokio::test]
async fn test_moderate_eachAction_shouldLeaveExpectedState() {
    let (repo, moderation, ids) = moderated_corpus().await;

    moderation.moderate(ids[0], ModerationAction::Approve, "admin", None).await.unwrap();
    moderation.moderate(ids[1], ModerationAction::Flag, "admin", None).await.unwrap();
    let rejected = moderation
        .moderate(ids[2], ModerationAction::Reject, "admin", Some("meaning lost".to_string()))
        .await
        .unwrap();

    let approved = repo.get_translation(ids[0]).await.unwrap().unwrap();
    let flagged = repo.get_translation(ids[1]).await.unwrap().unwrap();
    assert_eq!(approved.status, TranslationStatus::Approved);
    assert_eq!(flagged.status, TranslationStatus::Flagged);
    assert!(repo.get_translation(ids[2]).await.unwrap().is_none());

    let released = rejected.released_prompt_id.expect("rejection releases the prompt");
    let prompt = repo.get_prompt(released).await.unwrap().unwrap();
    assert_eq!(prompt.status, PromptStatus::Available);

    let counts = repo.translation_counts().await.unwrap();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.pending, 0);
}

#[tokio::test]
async fn test_moderate_afterReject_shouldTreatTranslationAsGone() {
    let (_repo, moderation, ids) = moderated_corpus().await;

    moderation.moderate(ids[0], ModerationAction::Reject, "admin", None).await.unwrap();
    let err = moderation
        .moderate(ids[0], ModerationAction::Approve, "admin", None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Translation not found"));
}

#[tokio::test]
async fn test_export_approvedAsCsv_shouldContainOnlyApprovedRows() {
    let (repo, moderation, ids) = moderated_corpus().await;
    moderation.moderate(ids[0], ModerationAction::Approve, "admin", None).await.unwrap();

    let file = export_translations(&repo, ExportFormat::Csv, Some(TranslationStatus::Approved), 100)
        .await
        .unwrap();

    assert_eq!(file.file_name, "translations_approved.csv");
    assert_eq!(file.records, 1);
    let lines: Vec<&str> = file.body.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "ID,English,Kikuyu,Status,Created At");
    assert!(lines[1].starts_with(&format!("{},\"Good evening, my friend.\",", ids[0])));
    assert!(lines[1].contains(",approved,"));
}

#[tokio::test]
async fn test_export_allAsJson_shouldListEveryTranslation() {
    let (repo, _moderation, _ids) = moderated_corpus().await;

    let file = export_translations(&repo, ExportFormat::Json, None, 100).await.unwrap();

    assert_eq!(file.file_name, "translations_all.json");
    assert_eq!(file.content_type, "application/json");
    let rows: Value = serde_json::from_str(&file.body).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["status"] == "pending"));
    assert!(rows.iter().any(|r| r["english"] == "The cows are in the shed."));
}
