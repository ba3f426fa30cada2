/*!
 * Tests for the SQLite repository
 */

use std::collections::HashSet;

use kikuyu_translate::database::models::{NewTranslation, PromptStatus, TranslationStatus};
use kikuyu_translate::database::Repository;
use kikuyu_translate::errors::ValidationError;

use crate::common;

fn translation(prompt_id: i64, user_id: i64, text: &str) -> NewTranslation {
    NewTranslation {
        prompt_id,
        user_id,
        kikuyu_text: text.to_string(),
        ip_address: Some("10.0.0.1".to_string()),
        user_agent: None,
    }
}

#[tokio::test]
async fn test_open_withNestedPath_shouldCreateDirectoryAndPersist() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("instance").join("kikuyu.db");

    {
        let repo = Repository::open(&path).unwrap();
        common::seed_prompts(&repo, &["The river is very wide today."]).await.unwrap();
    }

    assert!(path.exists());
    let reopened = Repository::open(&path).unwrap();
    assert_eq!(reopened.prompt_counts().await.unwrap().available, 1);
}

#[tokio::test]
async fn test_claimNextPrompt_concurrently_shouldNeverShareAPrompt() {
    let repo = Repository::new_in_memory().unwrap();
    let texts: Vec<String> = (0..8).map(|i| format!("Sentence number {} for claiming.", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    common::seed_prompts(&repo, &refs).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.claim_next_prompt(&format!("session-{}", i), None).await
        }));
    }

    let mut claimed = HashSet::new();
    for handle in handles {
        let prompt = handle.await.unwrap().unwrap().expect("a prompt for every session");
        assert!(claimed.insert(prompt.id), "prompt {} handed out twice", prompt.id);
    }

    assert!(repo.claim_next_prompt("late", None).await.unwrap().is_none());
    assert_eq!(repo.prompt_counts().await.unwrap().served, 8);
}

#[tokio::test]
async fn test_createTranslation_withSameTextDifferentCase_shouldBeDuplicate() {
    let repo = Repository::new_in_memory().unwrap();
    let ids = common::seed_prompts(&repo, &["Where are you going?"]).await.unwrap();
    let user = repo.get_or_create_user("session-a").await.unwrap();
    repo.claim_next_prompt(&user.session_id, None).await.unwrap();

    repo.create_translation(translation(ids[0], user.id, "Ũrathiĩ kũ?"))
        .await
        .unwrap();
    let err = repo
        .create_translation(translation(ids[0], user.id, "  ũrathiĩ   KŨ? "))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::Duplicate(_))
    ));
    assert_eq!(repo.count_user_translations(user.id, None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_createTranslation_forUnknownPrompt_shouldBeNotFound() {
    let repo = Repository::new_in_memory().unwrap();
    let user = repo.get_or_create_user("session-b").await.unwrap();

    let err = repo
        .create_translation(translation(999, user.id, "Nĩ wega."))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deleteTranslationLogged_shouldReleasePromptAndAudit() {
    let repo = Repository::new_in_memory().unwrap();
    common::seed_prompts(&repo, &["Bring me some water please."]).await.unwrap();
    let user = repo.get_or_create_user("session-c").await.unwrap();
    let prompt = repo.claim_next_prompt(&user.session_id, None).await.unwrap().unwrap();
    let stored = repo
        .create_translation(translation(prompt.id, user.id, "Ndehere maaĩ."))
        .await
        .unwrap();

    let released = repo
        .delete_translation_logged(stored.id, "reject", "admin", Some("wrong tense".to_string()))
        .await
        .unwrap();

    assert_eq!(released, Some(prompt.id));
    assert!(repo.get_translation(stored.id).await.unwrap().is_none());
    let prompt = repo.get_prompt(prompt.id).await.unwrap().unwrap();
    assert_eq!(prompt.status, PromptStatus::Available);

    let audit = repo.admin_actions_for(stored.id).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "reject");
    assert_eq!(audit[0].notes.as_deref(), Some("wrong tense"));
}

#[tokio::test]
async fn test_updateTranslationStatusLogged_forMissingRow_shouldReturnFalse() {
    let repo = Repository::new_in_memory().unwrap();

    let changed = repo
        .update_translation_status_logged(42, TranslationStatus::Approved, "approve", "admin", None)
        .await
        .unwrap();

    assert!(!changed);
    assert!(repo.admin_actions_for(42).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tryReserveApiCall_shouldStopAtLimitAndResetPerDay() {
    let repo = Repository::new_in_memory().unwrap();

    assert!(repo.try_reserve_api_call("2026-01-01", 2).await.unwrap());
    assert!(repo.try_reserve_api_call("2026-01-01", 2).await.unwrap());
    assert!(!repo.try_reserve_api_call("2026-01-01", 2).await.unwrap());
    assert_eq!(repo.api_calls_for_day("2026-01-01").await.unwrap(), 2);

    assert!(repo.try_reserve_api_call("2026-01-02", 2).await.unwrap());
    assert_eq!(repo.api_calls_for_day("2026-01-02").await.unwrap(), 1);
}
