/*!
 * Request throttling.
 *
 * `SlidingWindowLimiter` bounds requests per client over a rolling window and
 * guards the public `/api/` routes. `check_daily_submissions` enforces the
 * optional per-user daily translation limit.
 */

use anyhow::Result;
use axum::http::HeaderMap;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::app_config::RateLimitSpec;
use crate::database::Repository;
use crate::errors::ValidationError;

/// Number of tracked clients above which idle ones are dropped
const PRUNE_THRESHOLD: usize = 1024;

/// Verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one
    pub remaining: u32,
    /// Seconds until the oldest counted request leaves the window, when blocked
    pub retry_after_secs: u64,
}

/// Per-client sliding window limiter
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_spec(spec: &RateLimitSpec) -> Self {
        Self::new(spec.requests, spec.window())
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Record a request made at `now` and decide whether it may proceed
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut clients = self.clients.lock();

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, times| {
                times
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let times = clients.entry(client.to_string()).or_default();
        while times
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            times.pop_front();
        }

        if (times.len() as u32) < self.max_requests {
            times.push_back(now);
            return RateDecision {
                allowed: true,
                remaining: self.max_requests - times.len() as u32,
                retry_after_secs: 0,
            };
        }

        let retry_after = times
            .front()
            .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(self.window);

        RateDecision {
            allowed: false,
            remaining: 0,
            retry_after_secs: retry_after.as_secs().max(1),
        }
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

/// Identify the client behind a request
///
/// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then `"unknown"`.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("unknown")
        .to_string()
}

/// Start of the current UTC day as a stored timestamp
pub fn utc_day_start() -> String {
    format!("{}T00:00:00Z", Utc::now().format("%Y-%m-%d"))
}

/// Fail with `LimitReached` when the user has used up today's translations
///
/// `None` means unlimited.
pub async fn check_daily_submissions(
    repo: &Repository,
    user_id: i64,
    daily_limit: Option<u32>,
) -> Result<()> {
    let Some(limit) = daily_limit else {
        return Ok(());
    };

    let today = repo
        .count_user_translations_since(user_id, &utc_day_start())
        .await?;
    if today >= i64::from(limit) {
        return Err(ValidationError::LimitReached(format!(
            "Daily submission limit reached ({} translations per day)",
            limit
        ))
        .into());
    }
    Ok(())
}
