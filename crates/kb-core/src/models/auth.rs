use serde::{Deserialize, Serialize};
use validator::Validate;

/// Credentials submitted to `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "Username must be a valid e-mail address"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(equal = 6, message = "Verification code must have 6 characters"))]
    pub totp: String,
}

/// Body of `POST /api/auth/revalidate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidatePayload {
    pub token: String,
}

/// Session returned by login and revalidation. The token may be absent when the
/// backend refuses to renew.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Token if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
