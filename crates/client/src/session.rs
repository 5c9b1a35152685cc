//! Signed-in session as kept in client-side persisted storage.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use common::UserId;

/// Bearer token sent in the `Authorization` header.
///
/// `Debug` never prints the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// The signed-in user and their credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub token: BearerToken,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session without an expiry.
    pub fn new(user_id: UserId, token: BearerToken) -> Self {
        Self {
            user_id,
            token,
            expires_at: None,
        }
    }

    /// Returns a copy expiring at `expires_at`.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Client-side persisted storage for the session.
pub trait SessionStore: Send + Sync {
    /// Loads the stored session, expired or not.
    fn load(&self) -> Option<Session>;

    /// Stores a session, replacing any previous one.
    fn save(&self, session: Session);

    /// Removes the stored session.
    fn clear(&self);

    /// Returns the stored session if it has not expired.
    fn current(&self) -> Option<Session> {
        self.load().filter(|s| !s.is_expired_at(Utc::now()))
    }
}

/// Session store held in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `session`.
    pub fn signed_in(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(UserId::new("u1"), BearerToken::new("secret-token"))
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn expired_session_is_not_current() {
        let store =
            MemorySessionStore::signed_in(session().expiring_at(Utc::now() - Duration::minutes(1)));
        assert!(store.load().is_some());
        assert!(store.current().is_none());
    }

    #[test]
    fn save_and_clear() {
        let store = MemorySessionStore::new();
        assert!(store.current().is_none());
        store.save(session());
        assert_eq!(store.current().unwrap().user_id, UserId::new("u1"));
        store.clear();
        assert!(store.load().is_none());
    }
}
