//! Signed-cookie session.
//!
//! The cookie holds `<user_id>|<role>` signed with a key derived from
//! `SESSION_SECRET`. A cookie that fails verification or does not parse is
//! treated as absent.

use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha512};
use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie, Cookies, Key,
};

use crate::{errors::AppError, models::Role, state::AppState};

pub const SESSION_COOKIE: &str = "session";

/// What a logged-in session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: u64,
    pub role:    Role,
}

impl SessionData {
    fn encode(&self) -> String {
        format!("{}|{}", self.user_id, self.role.as_str())
    }

    fn decode(raw: &str) -> Option<Self> {
        let (id, role) = raw.split_once('|')?;
        Some(Self {
            user_id: id.parse().ok()?,
            role:    role.parse().ok()?,
        })
    }
}

/// Derive the 64-byte signing key from the configured secret.
pub fn derive_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Request-scoped handle on the session cookie.
pub struct Session {
    cookies: Cookies,
    key:     Key,
    max_age: i64,
}

impl Session {
    pub fn current(&self) -> Option<SessionData> {
        let cookie = self.cookies.signed(&self.key).get(SESSION_COOKIE)?;
        SessionData::decode(cookie.value())
    }

    pub fn establish(&self, data: SessionData) {
        let cookie = Cookie::build((SESSION_COOKIE, data.encode()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(CookieDuration::seconds(self.max_age))
            .build();
        self.cookies.signed(&self.key).add(cookie);
    }

    pub fn destroy(&self) {
        let cookie = Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .path("/")
            .max_age(CookieDuration::ZERO)
            .build();
        self.cookies.add(cookie);
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;
        Ok(Self {
            cookies,
            key:     state.cookie_key.clone(),
            max_age: state.config.session_max_age_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips() {
        let data = SessionData { user_id: 42, role: Role::Staff };
        assert_eq!(data.encode(), "42|staff");
        assert_eq!(SessionData::decode("42|staff"), Some(data));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert_eq!(SessionData::decode(""), None);
        assert_eq!(SessionData::decode("42"), None);
        assert_eq!(SessionData::decode("abc|admin"), None);
        assert_eq!(SessionData::decode("42|root"), None);
    }

    #[test]
    fn key_derivation_is_deterministic_per_secret() {
        let a = derive_key("a-very-long-session-secret");
        let b = derive_key("a-very-long-session-secret");
        let c = derive_key("another-long-session-secret");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
