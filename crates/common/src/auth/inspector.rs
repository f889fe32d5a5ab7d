//! Access-token inspection
//!
//! Reads the claims segment of a JWT without checking its signature; the
//! backend is the only verifier. Anything that cannot be read is treated as
//! expiring so the client refreshes or re-authenticates instead of sending a
//! dead token.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use super::types::TokenClaims;

/// Lookahead before expiry within which a token counts as expiring soon
pub const EXPIRY_LOOKAHEAD: Duration = Duration::from_secs(300);

/// Why a token could not be inspected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("token is not a three-part JWT")]
    Malformed,

    #[error("token payload is not base64url: {0}")]
    Encoding(String),

    #[error("token payload is not a JSON claims object: {0}")]
    Claims(String),
}

/// Decode the payload claims of a JWT
///
/// # Errors
/// Returns `InspectError` if the token does not have three segments or the
/// payload is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<TokenClaims, InspectError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(InspectError::Malformed);
    };

    // Some encoders keep the padding.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| InspectError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| InspectError::Claims(e.to_string()))
}

/// Expiry timestamp of a token, if it can be read
#[must_use]
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token).ok()?.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

/// Whether the token should be refreshed before use
///
/// True when the token cannot be decoded, carries no `exp`, or expires
/// within [`EXPIRY_LOOKAHEAD`].
#[must_use]
pub fn is_expiring_soon(token: &str) -> bool {
    is_expiring_within(token, EXPIRY_LOOKAHEAD, Utc::now())
}

/// [`is_expiring_soon`] with an explicit window and clock
#[must_use]
pub fn is_expiring_within(token: &str, window: Duration, now: DateTime<Utc>) -> bool {
    let Some(expires_at) = expires_at(token) else {
        return true;
    };
    let Ok(window) = chrono::Duration::from_std(window) else {
        return true;
    };
    // A window past the calendar range covers every expiry.
    now.checked_add_signed(window).map_or(true, |deadline| deadline >= expires_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{token_expiring_in, unsigned_token};

    #[test]
    fn decodes_subject_and_expiry() {
        let token = unsigned_token(&serde_json::json!({
            "sub": "analyst",
            "exp": 1_900_000_000_i64,
            "type": "access",
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("analyst"));
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(expires_at(&token).map(|t| t.timestamp()), Some(1_900_000_000));
    }

    #[test]
    fn four_minutes_is_expiring_six_is_not() {
        let now = Utc::now();
        let four = token_expiring_in(chrono::Duration::minutes(4));
        let six = token_expiring_in(chrono::Duration::minutes(6));

        assert!(is_expiring_within(&four, EXPIRY_LOOKAHEAD, now));
        assert!(!is_expiring_within(&six, EXPIRY_LOOKAHEAD, now));
        assert!(is_expiring_soon(&four));
        assert!(!is_expiring_soon(&six));
    }

    #[test]
    fn already_expired_is_expiring() {
        let token = token_expiring_in(chrono::Duration::minutes(-10));
        assert!(is_expiring_soon(&token));
    }

    #[test]
    fn malformed_tokens_are_expiring() {
        for token in ["", "opaque-token", "a.b", "a.b.c.d", "a.!!!.c", "a.bm90LWpzb24.c"] {
            assert!(is_expiring_soon(token), "{token:?} should be treated as expiring");
        }
        assert_eq!(decode_claims("a.b"), Err(InspectError::Malformed));
        assert!(matches!(decode_claims("a.bm90LWpzb24.c"), Err(InspectError::Claims(_))));
    }

    #[test]
    fn missing_exp_is_expiring() {
        let token = unsigned_token(&serde_json::json!({ "sub": "analyst" }));
        assert!(decode_claims(&token).is_ok());
        assert!(is_expiring_soon(&token));
    }

    #[test]
    fn window_beyond_calendar_range_is_expiring() {
        let token = token_expiring_in(chrono::Duration::hours(1));
        let huge = Duration::from_secs(10_000_000_000_000);

        assert!(chrono::Duration::from_std(huge).is_ok());
        assert!(is_expiring_within(&token, huge, Utc::now()));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = unsigned_token(&serde_json::json!({ "exp": 4_000_000_000_i64 }));
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        while parts[1].len() % 4 != 0 {
            parts[1].push('=');
        }
        let padded = parts.join(".");
        assert!(!is_expiring_soon(&padded));
    }
}
