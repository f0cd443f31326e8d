//! HTTP client for the knowledge base API.
//!
//! Provides a client whose every call goes through the bearer-token interceptor,
//! generic GET/POST/PUT/DELETE helpers, the record and file endpoints, and the edit
//! session that reconciles attachments on save. The CLI uses this client directly.

pub mod api;
pub mod auth;
pub mod files;
pub mod interceptor;
pub mod orchestrator;
pub mod refresh;
pub mod session;
pub mod token_store;

use kb_core::models::{LoginPayload, LoginResponse};
use kb_core::{ClientConfig, KbError, KbResult};
use kb_storage::KeyValueStore;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::AuthGateway;
use crate::interceptor::RequestInterceptor;
use crate::refresh::RefreshCoordinator;
use crate::session::SessionExpiredHandler;
use crate::token_store::TokenStore;

/// HTTP client for the knowledge base API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    gateway: AuthGateway,
    interceptor: Arc<RequestInterceptor>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        session: Arc<dyn SessionExpiredHandler>,
    ) -> KbResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| KbError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let tokens = TokenStore::new(store);
        let gateway = AuthGateway::new(client.clone(), config.api_url.clone(), tokens);
        let interceptor = RequestInterceptor::new(
            client.clone(),
            gateway.clone(),
            Arc::new(RefreshCoordinator::new()),
            session,
            config.refresh_threshold_secs,
        );

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            gateway,
            interceptor: Arc::new(interceptor),
        })
    }

    /// Client with the configured token storage; session expiry is only logged.
    pub async fn from_config(config: &ClientConfig) -> KbResult<Self> {
        let store = kb_storage::create_store(config).await?;
        Self::new(config, store, Arc::new(LogSessionExpired))
    }

    /// Create client from environment: KB_API_URL, KB_TOKEN_DIR, ...
    pub async fn from_env() -> KbResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::from_config(&config).await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn tokens(&self) -> &TokenStore {
        self.gateway.tokens()
    }

    pub fn auth(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    pub async fn login(&self, payload: &LoginPayload) -> KbResult<LoginResponse> {
        self.gateway.login(payload).await
    }

    pub async fn logout(&self) -> KbResult<()> {
        self.gateway.logout().await
    }

    /// Build the request and send it through the interceptor. Non-2xx responses
    /// become `KbError::Http` carrying the server's message.
    async fn dispatch(&self, request: RequestBuilder) -> KbResult<Response> {
        let request = request
            .build()
            .map_err(|e| KbError::Transport(format!("Failed to build request: {}", e)))?;
        let response = self.interceptor.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KbError::http(status.as_u16(), error_text));
        }
        Ok(response)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> KbResult<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        read_json(self.dispatch(request).await?).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> KbResult<T>
    where
        T: DeserializeOwned + Default,
        B: serde::Serialize + ?Sized,
    {
        let request = self.client.post(self.build_url(path)).json(body);
        read_json_or_default(self.dispatch(request).await?).await
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> KbResult<T>
    where
        T: DeserializeOwned + Default,
        B: serde::Serialize + ?Sized,
    {
        let request = self.client.put(self.build_url(path)).json(body);
        read_json_or_default(self.dispatch(request).await?).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> KbResult<T> {
        let request = self.client.post(self.build_url(path)).multipart(form);
        read_json(self.dispatch(request).await?).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> KbResult<()> {
        self.dispatch(self.client.delete(self.build_url(path)))
            .await?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> KbResult<T> {
    response
        .json()
        .await
        .map_err(|e| KbError::Decode(format!("Failed to parse response as JSON: {}", e)))
}

/// Like `read_json`, but an empty body yields `T::default()`.
async fn read_json_or_default<T: DeserializeOwned + Default>(response: Response) -> KbResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| KbError::Transport(format!("Failed to read response body: {}", e)))?;
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&body)?)
}

// Re-export the types callers need alongside the client.
pub use api::RecordApi;
pub use files::{FileApi, FILES_PATH};
pub use kb_core::models::{
    FileRef, FilesPayload, LinkPage, ListQuery, PendingFile, PreviewItem, Record, RecordForm,
    RecordRequest,
};
pub use orchestrator::{delete_record_with_files, EditSession, SavePlan};
pub use session::{LogSessionExpired, SessionExpiryCounter};
