/*!
 * Tests for configuration loading from the environment
 */

use std::collections::HashMap;

use kikuyu_translate::app_config::{AppEnvironment, Config, LogLevel, RateLimitSpec};

fn lookup_config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.environment, AppEnvironment::Development);
    assert_eq!(config.bind_address(), "0.0.0.0:5000");
    assert_eq!(config.server.database_path, "instance/kikuyu.db");
    assert_eq!(config.cache.max_age_days, 30);
    assert_eq!(config.limits.per_page, 20);
    assert_eq!(config.limits.max_export_records, 10_000);
    assert_eq!(config.limits.community_submissions_per_hour, 5);
    assert_eq!(
        config.limits.api_rate_limit,
        RateLimitSpec { requests: 100, window_secs: 3600 }
    );
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fromLookup_withOverrides_shouldApplyEveryValue() {
    let config = lookup_config(&[
        ("APP_ENV", "development"),
        ("HOST", "127.0.0.1"),
        ("PORT", "8080"),
        ("DATABASE_PATH", "/tmp/kikuyu.db"),
        ("OPENROUTER_API_KEY", "sk-test"),
        ("OPENROUTER_DAILY_LIMIT", "7"),
        ("MIN_CACHE_SIZE", "10"),
        ("PROMPT_BATCH_SIZE", "25"),
        ("DAILY_SUBMISSION_LIMIT", "40"),
        ("API_RATE_LIMIT", "30 per minute"),
        ("LOG_LEVEL", "WARNING"),
    ])
    .unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.server.database_path, "/tmp/kikuyu.db");
    assert!(config.openrouter.is_configured());
    assert_eq!(config.openrouter.daily_limit, 7);
    assert_eq!(config.cache.min_cache_size, 10);
    assert_eq!(config.cache.batch_size, 25);
    assert_eq!(config.limits.daily_submission_limit, Some(40));
    assert_eq!(config.limits.api_rate_limit.window_secs, 60);
    assert_eq!(config.log_level, LogLevel::Warn);
}

#[test]
fn test_fromLookup_withEmptyValues_shouldTreatThemAsUnset() {
    let config = lookup_config(&[("APP_ENV", "development"), ("PORT", ""), ("SECRET_KEY", "  ")]).unwrap();

    assert_eq!(config.server.port, 5000);
    assert!(config.security.secret_key.is_none());
    assert_eq!(config.secret_key(), "dev-secret-key-change-in-production");
}

#[test]
fn test_fromLookup_withMalformedRateLimit_shouldFail() {
    assert!(lookup_config(&[("API_RATE_LIMIT", "a hundred per hour")]).is_err());
}

#[test]
fn test_validate_withZeroBatchSize_shouldFail() {
    let mut config = Config::default();
    config.cache.batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_inProductionWithSecrets_shouldPass() {
    let config = lookup_config(&[("SECRET_KEY", "s3cret"), ("ADMIN_PASSWORD", "hunter2")]).unwrap();

    assert!(config.is_production());
    assert!(config.validate().is_ok());
    assert!(config.cookie_secure());
    assert_eq!(config.admin_password(), "hunter2");
}

#[test]
fn test_cookieSecure_inDevelopment_shouldFollowSetting() {
    let config = lookup_config(&[("APP_ENV", "development")]).unwrap();
    assert!(!config.cookie_secure());

    let config = lookup_config(&[("APP_ENV", "development"), ("SESSION_COOKIE_SECURE", "true")]).unwrap();
    assert!(config.cookie_secure());
}
