use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration module
/// This module loads the service configuration from environment variables,
/// applies defaults and validates the result.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Deployment environment
    #[serde(default)]
    pub environment: AppEnvironment,

    /// Debug mode
    #[serde(default)]
    pub debug: bool,

    /// HTTP server settings
    pub server: ServerSettings,

    /// LLM provider settings
    pub openrouter: OpenRouterConfig,

    /// Prompt cache settings
    pub cache: CacheConfig,

    /// Submission and access limits
    pub limits: LimitsConfig,

    /// Admin and session settings
    pub security: SecurityConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Deployment environment
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for AppEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(anyhow!("Invalid environment: {}", s)),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// OpenRouter service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenRouterConfig {
    /// API key for the service, empty when prompt generation is disabled
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model identifier
    #[serde(default = "default_openrouter_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,

    /// Maximum API calls per UTC day
    #[serde(default = "default_openrouter_daily_limit")]
    pub daily_limit: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between consecutive generation requests in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl OpenRouterConfig {
    /// Whether an API key is present
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Prompt cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Refill when fewer available prompts than this remain
    #[serde(default = "default_min_cache_size")]
    pub min_cache_size: usize,

    /// Number of prompts requested per refill
    #[serde(default = "default_prompt_batch_size")]
    pub batch_size: usize,

    /// Available prompts older than this are retired by cleanup
    #[serde(default = "default_prompt_max_age_days")]
    pub max_age_days: i64,

    /// Optional CSV dataset used when the LLM cannot supply prompts
    #[serde(default)]
    pub dataset_file: Option<String>,
}

/// Submission and access limits
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Translations per user per UTC day, `None` means unlimited
    #[serde(default)]
    pub daily_submission_limit: Option<u32>,

    /// Per-client limit for the JSON API
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: RateLimitSpec,

    /// Community prompt submissions per client per hour
    #[serde(default = "default_community_rate_limit")]
    pub community_submissions_per_hour: u32,

    /// Maximum rows in a single export
    #[serde(default = "default_max_export_records")]
    pub max_export_records: usize,

    /// Page size for admin listings
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

/// Admin and session settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Admin password, `None` when not provided through the environment
    #[serde(default, skip_serializing)]
    pub admin_password: Option<String>,

    /// Secret used to sign session cookies, `None` when not provided
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,

    /// Force the `Secure` cookie attribute
    #[serde(default)]
    pub session_cookie_secure: bool,

    /// Admin session lifetime in hours
    #[serde(default = "default_admin_session_hours")]
    pub admin_session_hours: i64,

    /// Contributor session cookie lifetime in hours
    #[serde(default = "default_user_session_hours")]
    pub user_session_hours: i64,
}

/// Request budget such as `100 per hour`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSpec {
    /// Requests allowed in the window
    pub requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitSpec {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl std::str::FromStr for RateLimitSpec {
    type Err = anyhow::Error;

    /// Parses `"<n> per <unit>"` or `"<n>/<unit>"`
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('/', " per ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();

        let (count, unit) = match parts.as_slice() {
            [count, "per", unit] => (*count, *unit),
            _ => return Err(anyhow!("Invalid rate limit '{}', expected '<n> per <unit>'", s)),
        };

        let requests: u32 = count
            .parse()
            .map_err(|_| anyhow!("Invalid request count in rate limit '{}'", s))?;

        let window_secs = match unit.trim_end_matches('s') {
            "second" | "sec" => 1,
            "minute" | "min" => 60,
            "hour" => 3600,
            "day" => 86_400,
            _ => return Err(anyhow!("Invalid time unit in rate limit '{}'", s)),
        };

        Ok(Self { requests, window_secs })
    }
}

impl std::fmt::Display for RateLimitSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.window_secs {
            1 => "second",
            60 => "minute",
            3600 => "hour",
            86_400 => "day",
            _ => return write!(f, "{} per {}s", self.requests, self.window_secs),
        };
        write!(f, "{} per {}", self.requests, unit)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" | "critical" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";
const DEV_ADMIN_PASSWORD: &str = "admin123";

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_database_path() -> String {
    "instance/kikuyu.db".to_string()
}

fn default_openrouter_model() -> String {
    "meta-llama/llama-3.3-70b-instruct:free".to_string()
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_daily_limit() -> u32 {
    50 // free tier
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_min_cache_size() -> usize {
    200
}

fn default_prompt_batch_size() -> usize {
    300
}

fn default_prompt_max_age_days() -> i64 {
    30
}

fn default_api_rate_limit() -> RateLimitSpec {
    RateLimitSpec { requests: 100, window_secs: 3600 }
}

fn default_community_rate_limit() -> u32 {
    5
}

fn default_max_export_records() -> usize {
    10_000
}

fn default_per_page() -> usize {
    20
}

fn default_admin_session_hours() -> i64 {
    8
}

fn default_user_session_hours() -> i64 {
    24
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values behave like unset ones
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
            match raw {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid value for {}: '{}'", key, value)),
                None => Ok(default),
            }
        }

        let environment = match get("APP_ENV").or_else(|| get("FLASK_ENV")) {
            Some(value) => value.parse()?,
            None => AppEnvironment::default(),
        };

        let debug = get("DEBUG").map(|v| parse_bool(&v)).unwrap_or(false);

        let log_level = match get("LOG_LEVEL") {
            Some(value) => value.parse()?,
            None => LogLevel::default(),
        };

        let daily_submission_limit = match get("DAILY_SUBMISSION_LIMIT") {
            None => None,
            Some(value) if value.trim().eq_ignore_ascii_case("none") => None,
            Some(value) => {
                let limit: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid value for DAILY_SUBMISSION_LIMIT: '{}'", value))?;
                (limit > 0).then_some(limit)
            }
        };

        let api_rate_limit = match get("API_RATE_LIMIT") {
            Some(value) => value.parse()?,
            None => default_api_rate_limit(),
        };

        Ok(Config {
            environment,
            debug,
            server: ServerSettings {
                host: get("HOST").unwrap_or_else(default_host),
                port: parsed("PORT", get("PORT"), default_port())?,
                database_path: get("DATABASE_PATH").unwrap_or_else(default_database_path),
            },
            openrouter: OpenRouterConfig {
                api_key: get("OPENROUTER_API_KEY").unwrap_or_default(),
                model: get("OPENROUTER_MODEL").unwrap_or_else(default_openrouter_model),
                base_url: get("OPENROUTER_BASE_URL").unwrap_or_else(default_openrouter_base_url),
                daily_limit: parsed(
                    "OPENROUTER_DAILY_LIMIT",
                    get("OPENROUTER_DAILY_LIMIT"),
                    default_openrouter_daily_limit(),
                )?,
                timeout_secs: parsed(
                    "OPENROUTER_TIMEOUT_SECS",
                    get("OPENROUTER_TIMEOUT_SECS"),
                    default_timeout_secs(),
                )?,
                request_delay_ms: parsed(
                    "PROMPT_REQUEST_DELAY_MS",
                    get("PROMPT_REQUEST_DELAY_MS"),
                    default_request_delay_ms(),
                )?,
            },
            cache: CacheConfig {
                min_cache_size: parsed("MIN_CACHE_SIZE", get("MIN_CACHE_SIZE"), default_min_cache_size())?,
                batch_size: parsed("PROMPT_BATCH_SIZE", get("PROMPT_BATCH_SIZE"), default_prompt_batch_size())?,
                max_age_days: parsed(
                    "PROMPT_MAX_AGE_DAYS",
                    get("PROMPT_MAX_AGE_DAYS"),
                    default_prompt_max_age_days(),
                )?,
                dataset_file: get("PROMPT_DATASET_FILE"),
            },
            limits: LimitsConfig {
                daily_submission_limit,
                api_rate_limit,
                community_submissions_per_hour: parsed(
                    "COMMUNITY_SUBMISSION_RATE_LIMIT",
                    get("COMMUNITY_SUBMISSION_RATE_LIMIT"),
                    default_community_rate_limit(),
                )?,
                max_export_records: parsed(
                    "MAX_EXPORT_RECORDS",
                    get("MAX_EXPORT_RECORDS"),
                    default_max_export_records(),
                )?,
                per_page: parsed("PAGINATION_PER_PAGE", get("PAGINATION_PER_PAGE"), default_per_page())?,
            },
            security: SecurityConfig {
                admin_password: get("ADMIN_PASSWORD"),
                secret_key: get("SECRET_KEY"),
                session_cookie_secure: get("SESSION_COOKIE_SECURE")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
                admin_session_hours: parsed(
                    "ADMIN_SESSION_TIMEOUT_HOURS",
                    get("ADMIN_SESSION_TIMEOUT_HOURS"),
                    default_admin_session_hours(),
                )?,
                user_session_hours: parsed(
                    "USER_SESSION_TIMEOUT_HOURS",
                    get("USER_SESSION_TIMEOUT_HOURS"),
                    default_user_session_hours(),
                )?,
            },
            log_level,
        })
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.cache.batch_size == 0 {
            return Err(anyhow!("PROMPT_BATCH_SIZE must be greater than zero"));
        }

        if self.limits.api_rate_limit.requests == 0 {
            return Err(anyhow!("API_RATE_LIMIT must allow at least one request"));
        }

        if self.limits.per_page == 0 {
            return Err(anyhow!("PAGINATION_PER_PAGE must be greater than zero"));
        }

        url::Url::parse(&self.openrouter.base_url)
            .map_err(|e| anyhow!("Invalid OPENROUTER_BASE_URL '{}': {}", self.openrouter.base_url, e))?;

        if self.is_production() {
            if self.security.secret_key.is_none() {
                return Err(anyhow!("SECRET_KEY must be set in production"));
            }
            if self.security.admin_password.is_none() {
                return Err(anyhow!("ADMIN_PASSWORD must be set in production"));
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == AppEnvironment::Production
    }

    /// Whether session cookies carry the `Secure` attribute
    pub fn cookie_secure(&self) -> bool {
        self.is_production() || self.security.session_cookie_secure
    }

    /// Log level after applying the debug flag
    pub fn effective_log_level(&self) -> LogLevel {
        if self.debug {
            self.log_level.max(LogLevel::Debug)
        } else {
            self.log_level
        }
    }

    /// `host:port` string to bind the listener on
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Secret for cookie signatures, falling back to the development value
    pub fn secret_key(&self) -> &str {
        self.security.secret_key.as_deref().unwrap_or(DEV_SECRET_KEY)
    }

    /// Admin password, falling back to the development value
    pub fn admin_password(&self) -> &str {
        self.security.admin_password.as_deref().unwrap_or(DEV_ADMIN_PASSWORD)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            environment: AppEnvironment::Development,
            debug: false,
            server: ServerSettings {
                host: default_host(),
                port: default_port(),
                database_path: default_database_path(),
            },
            openrouter: OpenRouterConfig {
                api_key: String::new(),
                model: default_openrouter_model(),
                base_url: default_openrouter_base_url(),
                daily_limit: default_openrouter_daily_limit(),
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
            },
            cache: CacheConfig {
                min_cache_size: default_min_cache_size(),
                batch_size: default_prompt_batch_size(),
                max_age_days: default_prompt_max_age_days(),
                dataset_file: None,
            },
            limits: LimitsConfig {
                daily_submission_limit: None,
                api_rate_limit: default_api_rate_limit(),
                community_submissions_per_hour: default_community_rate_limit(),
                max_export_records: default_max_export_records(),
                per_page: default_per_page(),
            },
            security: SecurityConfig {
                admin_password: None,
                secret_key: None,
                session_cookie_secure: false,
                admin_session_hours: default_admin_session_hours(),
                user_session_hours: default_user_session_hours(),
            },
            log_level: LogLevel::default(),
        }
    }
}
