//! Per-request bearer token handling.
//!
//! Every outgoing call except those to the auth endpoints goes through
//! `RequestInterceptor::execute`, which decides whether to send it as-is, attach the
//! stored token, or revalidate the token first. A 401/403 on any intercepted call
//! ends the session.

use chrono::Utc;
use kb_core::token::{decode_expiration, will_expire_within_at};
use kb_core::{KbError, KbResult};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::Arc;

use crate::auth::{AuthGateway, AUTH_PREFIX};
use crate::refresh::RefreshCoordinator;
use crate::session::SessionExpiredHandler;
use crate::token_store::TokenStore;

/// What to do with an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// No token: send unauthenticated.
    Forward,
    /// Send with this token.
    Attach(String),
    /// Token is about to expire and nobody is refreshing it yet.
    Refresh(String),
}

pub fn decide(token: Option<String>, expiring: bool, refreshing: bool) -> AuthDecision {
    match token {
        None => AuthDecision::Forward,
        Some(token) if !expiring || refreshing => AuthDecision::Attach(token),
        Some(token) => AuthDecision::Refresh(token),
    }
}

pub fn is_auth_endpoint(request: &Request) -> bool {
    request.url().path().contains(AUTH_PREFIX)
}

pub struct RequestInterceptor {
    client: Client,
    gateway: AuthGateway,
    tokens: TokenStore,
    refresh: Arc<RefreshCoordinator>,
    session: Arc<dyn SessionExpiredHandler>,
    threshold_secs: i64,
}

impl RequestInterceptor {
    pub fn new(
        client: Client,
        gateway: AuthGateway,
        refresh: Arc<RefreshCoordinator>,
        session: Arc<dyn SessionExpiredHandler>,
        threshold_secs: i64,
    ) -> Self {
        let tokens = gateway.tokens().clone();
        Self {
            client,
            gateway,
            tokens,
            refresh,
            session,
            threshold_secs,
        }
    }

    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.refresh
    }

    /// Send `request`, handling the bearer token. Non-auth responses other than
    /// 401/403 are returned untouched for the caller to inspect.
    pub async fn execute(&self, mut request: Request) -> KbResult<Response> {
        if is_auth_endpoint(&request) {
            return self.send(request).await;
        }

        let token = self.tokens.get_token().await?;
        let expiring = token.as_deref().is_some_and(|t| {
            will_expire_within_at(decode_expiration(t), self.threshold_secs, Utc::now())
        });

        match decide(token, expiring, self.refresh.is_refreshing()) {
            AuthDecision::Forward => {
                tracing::debug!(url = %request.url(), "No token; sending unauthenticated");
            }
            AuthDecision::Attach(token) => attach_bearer(&mut request, &token)?,
            AuthDecision::Refresh(current) => match self.refresh.try_begin() {
                Some(_guard) => {
                    let fresh = self.revalidate(&current).await?;
                    attach_bearer(&mut request, &fresh)?;
                }
                // Another call claimed the refresh in between; go with what we hold.
                None => attach_bearer(&mut request, &current)?,
            },
        }

        let response = self.send(request).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Request rejected; ending session");
            self.invalidate_session().await;
            return Err(KbError::http(status.as_u16(), message));
        }
        Ok(response)
    }

    async fn revalidate(&self, current: &str) -> KbResult<String> {
        tracing::debug!("Token close to expiry; revalidating");
        match self.gateway.revalidate_token(current).await {
            Ok(response) => match response.token() {
                Some(token) => Ok(token.to_string()),
                None => {
                    tracing::warn!("Revalidation returned no token");
                    self.invalidate_session().await;
                    Err(KbError::Auth(
                        "Token revalidation returned no token".to_string(),
                    ))
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "Token revalidation failed");
                self.invalidate_session().await;
                Err(KbError::Auth(format!("Token revalidation failed: {}", err)))
            }
        }
    }

    async fn invalidate_session(&self) {
        if let Err(err) = self.tokens.clear().await {
            tracing::error!(error = %err, "Failed to clear token");
        }
        self.session.on_session_expired();
    }

    async fn send(&self, request: Request) -> KbResult<Response> {
        self.client
            .execute(request)
            .await
            .map_err(|e| KbError::Transport(e.to_string()))
    }
}

fn attach_bearer(request: &mut Request, token: &str) -> KbResult<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| KbError::Auth("Stored token is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionExpiryCounter;
    use kb_core::token::testing::token_expiring_in;
    use async_trait::async_trait;
    use kb_storage::{KeyValueStore, MemoryStore, StorageResult, TokenBackend};
    use mockito::{Matcher, Server, ServerGuard};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key).await
        }

        fn backend_type(&self) -> TokenBackend {
            TokenBackend::Memory
        }
    }

    struct Harness {
        interceptor: RequestInterceptor,
        tokens: TokenStore,
        store: Arc<CountingStore>,
        expired: Arc<SessionExpiryCounter>,
        client: Client,
    }

    fn harness(server: &ServerGuard) -> Harness {
        let client = Client::new();
        let store = Arc::new(CountingStore::default());
        let tokens = TokenStore::new(store.clone());
        let gateway = AuthGateway::new(client.clone(), server.url(), tokens.clone());
        let expired = Arc::new(SessionExpiryCounter::new());
        let interceptor = RequestInterceptor::new(
            client.clone(),
            gateway,
            Arc::new(RefreshCoordinator::new()),
            expired.clone(),
            60,
        );
        Harness {
            interceptor,
            tokens,
            store,
            expired,
            client,
        }
    }

    fn list_request(h: &Harness, server: &ServerGuard) -> Request {
        h.client
            .get(format!("{}/api/atividades", server.url()))
            .build()
            .unwrap()
    }

    #[test]
    fn decision_table() {
        assert_eq!(decide(None, true, false), AuthDecision::Forward);
        assert_eq!(decide(Some("t".into()), false, false), AuthDecision::Attach("t".into()));
        assert_eq!(decide(Some("t".into()), true, true), AuthDecision::Attach("t".into()));
        assert_eq!(decide(Some("t".into()), true, false), AuthDecision::Refresh("t".into()));
    }

    #[tokio::test]
    async fn no_token_forwards_unmodified() {
        let mut server = Server::new_async().await;
        let api = server
            .mock("GET", "/api/atividades")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        let h = harness(&server);
        h.interceptor.execute(list_request(&h, &server)).await.unwrap();
        api.assert_async().await;
    }

    #[tokio::test]
    async fn fresh_token_is_attached_without_revalidation() {
        let mut server = Server::new_async().await;
        let token = token_expiring_in(3600);
        let api = server
            .mock("GET", "/api/atividades")
            .match_header("authorization", format!("Bearer {}", token).as_str())
            .with_status(200)
            .create_async()
            .await;
        let revalidate = server
            .mock("POST", "/api/auth/revalidate")
            .expect(0)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&token).await.unwrap();
        h.interceptor.execute(list_request(&h, &server)).await.unwrap();

        api.assert_async().await;
        revalidate.assert_async().await;
        assert_eq!(h.tokens.get_token().await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn expiring_token_is_revalidated_once() {
        let mut server = Server::new_async().await;
        let old = token_expiring_in(30);
        let fresh = token_expiring_in(3600);
        let revalidate = server
            .mock("POST", "/api/auth/revalidate")
            .match_body(Matcher::PartialJson(serde_json::json!({ "token": old })))
            .with_status(200)
            .with_body(serde_json::json!({ "status": "ok", "token": fresh }).to_string())
            .expect(1)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/api/atividades")
            .match_header("authorization", format!("Bearer {}", fresh).as_str())
            .with_status(200)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&old).await.unwrap();
        h.interceptor.execute(list_request(&h, &server)).await.unwrap();

        revalidate.assert_async().await;
        api.assert_async().await;
        assert_eq!(h.tokens.get_token().await.unwrap(), Some(fresh));
        // One write for the seeded token, one for the refreshed one.
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 2);
        assert!(!h.interceptor.refresh_coordinator().is_refreshing());
    }

    #[tokio::test]
    async fn failed_revalidation_clears_session_and_drops_request() {
        let mut server = Server::new_async().await;
        let revalidate = server
            .mock("POST", "/api/auth/revalidate")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/api/atividades")
            .expect(0)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&token_expiring_in(10)).await.unwrap();
        let err = h
            .interceptor
            .execute(list_request(&h, &server))
            .await
            .unwrap_err();

        assert!(matches!(err, KbError::Auth(_)));
        revalidate.assert_async().await;
        api.assert_async().await;
        assert_eq!(h.tokens.get_token().await.unwrap(), None);
        assert_eq!(h.expired.count(), 1);
        assert!(!h.interceptor.refresh_coordinator().is_refreshing());
    }

    #[tokio::test]
    async fn revalidation_without_token_clears_session() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/auth/revalidate")
            .with_status(200)
            .with_body(r#"{"status":"expired"}"#)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/api/atividades")
            .expect(0)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&token_expiring_in(10)).await.unwrap();
        let err = h
            .interceptor
            .execute(list_request(&h, &server))
            .await
            .unwrap_err();

        assert!(matches!(err, KbError::Auth(_)));
        api.assert_async().await;
        assert_eq!(h.tokens.get_token().await.unwrap(), None);
        assert_eq!(h.expired.count(), 1);
    }

    #[tokio::test]
    async fn refresh_in_flight_sends_current_token() {
        let mut server = Server::new_async().await;
        let old = token_expiring_in(30);
        let revalidate = server
            .mock("POST", "/api/auth/revalidate")
            .expect(0)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/api/atividades")
            .match_header("authorization", format!("Bearer {}", old).as_str())
            .with_status(200)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&old).await.unwrap();
        let _held = h.interceptor.refresh_coordinator().try_begin();
        h.interceptor.execute(list_request(&h, &server)).await.unwrap();

        revalidate.assert_async().await;
        api.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_response_ends_session_once() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/atividades")
            .with_status(401)
            .with_body("token revoked")
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&token_expiring_in(3600)).await.unwrap();
        let err = h
            .interceptor
            .execute(list_request(&h, &server))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.is_session_fatal());
        assert_eq!(h.tokens.get_token().await.unwrap(), None);
        assert_eq!(h.expired.count(), 1);
    }

    #[tokio::test]
    async fn forbidden_without_token_still_notifies() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/atividades")
            .with_status(403)
            .create_async()
            .await;

        let h = harness(&server);
        let err = h
            .interceptor
            .execute(list_request(&h, &server))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(h.expired.count(), 1);
    }

    #[tokio::test]
    async fn auth_endpoints_are_not_intercepted() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/api/auth/login")
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .create_async()
            .await;

        let h = harness(&server);
        h.tokens.set_token(&token_expiring_in(3600)).await.unwrap();
        let request = h
            .client
            .post(format!("{}/api/auth/login", server.url()))
            .build()
            .unwrap();
        let response = h.interceptor.execute(request).await.unwrap();

        login.assert_async().await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(h.tokens.get_token().await.unwrap().is_some());
        assert_eq!(h.expired.count(), 0);
    }
}
