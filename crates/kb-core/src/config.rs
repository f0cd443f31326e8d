//! Configuration module
//!
//! Client settings come from `KB_*` environment variables (optionally via `.env`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KbError, KbResult};
use crate::storage_types::TokenBackend;
use crate::token::DEFAULT_REFRESH_THRESHOLD_SECS;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TOKEN_DIR: &str = ".kb";
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Raw `KB_*` variables as read by envy.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default = "default_api_url")]
    api_url: String,
    #[serde(default)]
    token_backend: Option<String>,
    #[serde(default)]
    token_dir: Option<PathBuf>,
    #[serde(default = "default_refresh_threshold")]
    refresh_threshold_secs: i64,
    #[serde(default = "default_http_timeout")]
    http_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_refresh_threshold() -> i64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}

fn default_http_timeout() -> u64 {
    HTTP_TIMEOUT_SECS
}

/// Knowledge base client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub token_backend: TokenBackend,
    pub token_dir: PathBuf,
    /// Tokens this close to expiry are revalidated before use.
    pub refresh_threshold_secs: i64,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_backend: TokenBackend::Local,
            token_dir: PathBuf::from(DEFAULT_TOKEN_DIR),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> KbResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load from explicit `(KEY, value)` pairs; only `KB_`-prefixed keys are read.
    pub fn from_vars<I>(vars: I) -> KbResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: EnvConfig = envy::prefixed("KB_").from_iter(vars)?;

        let token_backend = match raw.token_backend.as_deref() {
            Some(value) => value
                .parse::<TokenBackend>()
                .map_err(|e| KbError::Config(e.to_string()))?,
            None => TokenBackend::Local,
        };

        let config = Self {
            api_url: raw.api_url.trim().trim_end_matches('/').to_string(),
            token_backend,
            token_dir: raw
                .token_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_DIR)),
            refresh_threshold_secs: raw.refresh_threshold_secs,
            http_timeout: Duration::from_secs(raw.http_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KbResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(KbError::Config(format!(
                "KB_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.http_timeout.is_zero() {
            return Err(KbError::Config(
                "KB_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.refresh_threshold_secs < 0 {
            return Err(KbError::Config(
                "KB_REFRESH_THRESHOLD_SECS must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_vars(vars(&[("HOME", "/root")])).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.token_backend, TokenBackend::Local);
        assert_eq!(config.token_dir, PathBuf::from(".kb"));
        assert_eq!(config.refresh_threshold_secs, 60);
        assert_eq!(config.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn reads_prefixed_variables() {
        let config = ClientConfig::from_vars(vars(&[
            ("KB_API_URL", "https://kb.example.com/"),
            ("KB_TOKEN_BACKEND", "memory"),
            ("KB_TOKEN_DIR", "/tmp/kb"),
            ("KB_REFRESH_THRESHOLD_SECS", "120"),
            ("KB_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://kb.example.com");
        assert_eq!(config.token_backend, TokenBackend::Memory);
        assert_eq!(config.token_dir, PathBuf::from("/tmp/kb"));
        assert_eq!(config.refresh_threshold_secs, 120);
        assert_eq!(config.build_url("/api/atividades"), "https://kb.example.com/api/atividades");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::from_vars(vars(&[("KB_API_URL", "ftp://x")])).is_err());
        assert!(ClientConfig::from_vars(vars(&[("KB_HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert!(ClientConfig::from_vars(vars(&[("KB_TOKEN_BACKEND", "s3")])).is_err());
        assert!(matches!(
            ClientConfig::from_vars(vars(&[("KB_HTTP_TIMEOUT_SECS", "soon")])),
            Err(KbError::Config(_))
        ));
    }
}
