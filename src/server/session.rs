/*!
 * Contributor and admin sessions.
 *
 * Contributors are anonymous: a signed `kikuyu_session` cookie carries a
 * random session ID, and a tampered or missing cookie simply starts a new
 * session. Admin sessions are random tokens kept in memory with an expiry.
 */

use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "kikuyu_session";
pub const ADMIN_COOKIE: &str = "admin_session";

/// Hex characters of the SHA-256 digest kept as signature
const SIGNATURE_LEN: usize = 32;

/// Session attached to every request by the session middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorSession {
    pub id: String,
    /// A cookie must be issued with the response
    pub is_new: bool,
}

impl ContributorSession {
    pub fn fresh() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_new: true,
        }
    }
}

/// Authenticated admin, attached by the admin guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub admin_id: String,
    pub token: String,
}

fn signature(secret: &str, session_id: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", secret, session_id).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(SIGNATURE_LEN);
    hex
}

/// `<id>.<signature>`
pub fn sign_session_id(secret: &str, session_id: &str) -> String {
    format!("{}.{}", session_id, signature(secret, session_id))
}

/// Session ID from a cookie value, `None` when the signature does not match
pub fn verify_session_cookie(secret: &str, value: &str) -> Option<String> {
    let (id, sig) = value.rsplit_once('.')?;
    if id.is_empty() || sig.len() != SIGNATURE_LEN {
        return None;
    }

    let expected = signature(secret, id);
    let matches = expected
        .bytes()
        .zip(sig.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0;
    matches.then(|| id.to_string())
}

/// Value of a named cookie from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` value with the flags used for every cookie we issue
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes a cookie
pub fn expired_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, secure)
}

/// In-memory admin session store
#[derive(Debug)]
pub struct AdminSessions {
    lifetime: ChronoDuration,
    sessions: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl AdminSessions {
    pub fn new(lifetime_hours: i64) -> Self {
        Self {
            lifetime: ChronoDuration::hours(lifetime_hours),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// Open a session and return its token
    pub fn create(&self, admin_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let expires = Utc::now() + self.lifetime;

        let mut sessions = self.sessions.lock();
        let now = Utc::now();
        sessions.retain(|_, (_, expiry)| *expiry > now);
        sessions.insert(token.clone(), (admin_id.to_string(), expires));
        token
    }

    /// Identity behind a token, dropping it when expired
    pub fn validate(&self, token: &str) -> Option<AdminIdentity> {
        let mut sessions = self.sessions.lock();
        let (admin_id, expiry) = sessions.get(token)?.clone();

        if expiry <= Utc::now() {
            sessions.remove(token);
            return None;
        }

        Some(AdminIdentity {
            admin_id,
            token: token.to_string(),
        })
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().remove(token).is_some()
    }

    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .lock()
            .values()
            .filter(|(_, expiry)| *expiry > now)
            .count()
    }
}
