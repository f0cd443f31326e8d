//! Holder of the current bearer token.
//!
//! The token lives in an injected `KeyValueStore` under a single key. Expiry is read
//! from the token's own claims; a token whose expiry cannot be read is treated as
//! already expired.

use chrono::{DateTime, Utc};
use kb_core::token::{decode_expiration, is_expired_at, will_expire_within_at};
use kb_core::KbResult;
use kb_storage::KeyValueStore;
use std::sync::Arc;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "kb_token";

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn set_token(&self, token: &str) -> KbResult<()> {
        self.store.set(TOKEN_KEY, token).await?;
        Ok(())
    }

    /// Current token; empty values count as absent.
    pub async fn get_token(&self) -> KbResult<Option<String>> {
        let token = self.store.get(TOKEN_KEY).await?;
        Ok(token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    pub async fn clear(&self) -> KbResult<()> {
        self.store.remove(TOKEN_KEY).await?;
        Ok(())
    }

    pub async fn get_expiration_date(&self) -> KbResult<Option<DateTime<Utc>>> {
        Ok(self
            .get_token()
            .await?
            .as_deref()
            .and_then(decode_expiration))
    }

    /// True when there is no token, no readable expiry, or the expiry has passed.
    pub async fn is_expired(&self) -> KbResult<bool> {
        let exp = self.get_expiration_date().await?;
        Ok(is_expired_at(exp, Utc::now()))
    }

    /// True when there is no token, no readable expiry, or at most `seconds` remain.
    pub async fn will_expire_within(&self, seconds: i64) -> KbResult<bool> {
        let exp = self.get_expiration_date().await?;
        Ok(will_expire_within_at(exp, seconds, Utc::now()))
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("backend", &self.store.backend_type())
            .finish()
    }
}
