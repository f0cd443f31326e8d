//! Login and token revalidation against `/api/auth`.
//!
//! These calls bypass the request interceptor. The backend alone issues and signs
//! tokens; this side only stores what it gets back.

use kb_core::models::{LoginPayload, LoginResponse, RevalidatePayload};
use kb_core::{ensure_valid, KbError, KbResult};
use reqwest::Client;

use crate::token_store::TokenStore;

/// Path prefix of the authentication endpoints.
pub const AUTH_PREFIX: &str = "/api/auth";

#[derive(Clone, Debug)]
pub struct AuthGateway {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl AuthGateway {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.base_url, AUTH_PREFIX, endpoint)
    }

    /// Submit credentials. On success the returned token is stored. Any non-2xx
    /// response fails with `KbError::Auth`; there is no retry.
    pub async fn login(&self, payload: &LoginPayload) -> KbResult<LoginResponse> {
        ensure_valid(payload)?;

        let response = self.post("login", payload).await?;
        if let Some(token) = response.token() {
            self.tokens.set_token(token).await?;
            tracing::info!(username = %payload.username, "Logged in");
        }
        Ok(response)
    }

    /// Exchange `current_token` for a fresh one. On success the new token is stored;
    /// clearing the store on failure is the caller's call.
    pub async fn revalidate_token(&self, current_token: &str) -> KbResult<LoginResponse> {
        let body = RevalidatePayload {
            token: current_token.to_string(),
        };
        let response = self.post("revalidate", &body).await?;
        if let Some(token) = response.token() {
            self.tokens.set_token(token).await?;
            tracing::info!("Token revalidated");
        }
        Ok(response)
    }

    pub async fn logout(&self) -> KbResult<()> {
        self.tokens.clear().await
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    async fn post<B: serde::Serialize>(&self, endpoint: &str, body: &B) -> KbResult<LoginResponse> {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| KbError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KbError::Auth(format!("{} {}", status, error_text.trim())));
        }

        response
            .json()
            .await
            .map_err(|e| KbError::Decode(format!("Failed to parse auth response: {}", e)))
    }
}
