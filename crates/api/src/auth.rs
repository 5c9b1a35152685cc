//! Bearer token resolution.
//!
//! Tokens are opaque strings mapped to users in memory. Issuing and
//! verifying real credentials belongs to an authentication service in front
//! of this server.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use common::UserId;

use crate::error::ApiError;

/// In-memory map from bearer token to user.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh random token for `user_id`.
    pub fn issue(&self, user_id: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.register(token.clone(), user_id);
        token
    }

    /// Registers a known token for `user_id`.
    pub fn register(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user_id);
    }

    /// Revokes a token. Returns true if it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Looks up the user a token belongs to.
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    /// Resolves the `Authorization: Bearer <token>` header to a user.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;
        self.resolve(token).ok_or(ApiError::Unauthorized)
    }
}
