//! Bearer token claim decoding and expiry arithmetic.
//!
//! Tokens are JWTs issued by the backend. Only the payload segment is read and the
//! signature is never checked: the backend stays the authority on validity, this
//! module only answers "when does the token say it expires".

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};

/// Seconds before expiry at which a token is revalidated.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 60;

/// Label used when a token carries no readable expiry.
pub const UNKNOWN_LABEL: &str = "—";

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims object of a JWT.
///
/// Returns `None` unless the token has exactly three segments and the middle one is
/// base64 (url-safe or standard alphabet, padding optional) holding a JSON object.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let normalized = parts[1].replace('+', "-").replace('/', "_");
    let bytes = PAYLOAD_ENGINE.decode(normalized.as_bytes()).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Expiration instant declared by the token's numeric `exp` claim.
pub fn decode_expiration(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_claims(token)?.get("exp")?.as_f64()?;
    if !exp.is_finite() {
        return None;
    }
    let millis = (exp * 1000.0) as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// True when `exp` is unknown or lies at or before `now`.
pub fn is_expired_at(exp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match exp {
        Some(exp) => exp <= now,
        None => true,
    }
}

/// True when `exp` is unknown or at most `seconds` away from `now`.
pub fn will_expire_within_at(exp: Option<DateTime<Utc>>, seconds: i64, now: DateTime<Utc>) -> bool {
    match exp {
        Some(exp) => (exp - now).num_milliseconds() <= seconds.saturating_mul(1000),
        None => true,
    }
}

/// Remaining lifetime of a token, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    Unknown,
    Expired,
    Remaining(Duration),
}

impl TimeLeft {
    /// `HH:MM:SS` when at least an hour remains, `MM:SS` otherwise.
    pub fn label(&self, fallback: &str) -> String {
        match self {
            TimeLeft::Unknown => fallback.to_string(),
            TimeLeft::Expired => "expired".to_string(),
            TimeLeft::Remaining(remaining) => {
                let total = remaining.num_seconds();
                let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
                if h > 0 {
                    format!("{:02}:{:02}:{:02}", h, m, s)
                } else {
                    format!("{:02}:{:02}", m, s)
                }
            }
        }
    }
}

pub fn time_left(token: Option<&str>, now: DateTime<Utc>) -> TimeLeft {
    let Some(exp) = token.and_then(decode_expiration) else {
        return TimeLeft::Unknown;
    };
    let remaining = exp - now;
    if remaining.num_milliseconds() <= 0 {
        TimeLeft::Expired
    } else {
        TimeLeft::Remaining(remaining)
    }
}

/// Still valid but within `threshold_secs` of expiring.
///
/// Unlike `will_expire_within_at` this is a display predicate: an expired or
/// undecodable token is not "expiring soon".
pub fn is_expiring_soon(token: Option<&str>, threshold_secs: i64, now: DateTime<Utc>) -> bool {
    match time_left(token, now) {
        TimeLeft::Remaining(remaining) => {
            remaining.num_milliseconds() <= threshold_secs.saturating_mul(1000)
        }
        TimeLeft::Unknown | TimeLeft::Expired => false,
    }
}

/// Unsigned tokens for tests.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use chrono::Utc;
    use serde_json::Value;

    /// Build a structurally valid JWT around `claims` with a dummy signature.
    pub fn unsigned_token(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    /// Token whose `exp` lies `secs` seconds from now (negative for the past).
    pub fn token_expiring_in(secs: i64) -> String {
        let exp = Utc::now().timestamp() + secs;
        unsigned_token(&serde_json::json!({ "sub": "user@example.com", "exp": exp }))
    }
}
