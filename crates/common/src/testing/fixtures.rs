//! Token fixtures
//!
//! Tokens are structurally valid JWTs with a throwaway signature segment.
//! The client never verifies signatures, so these exercise the same decode
//! path as real backend tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Encode `claims` as the payload of an unsigned JWT
///
/// # Examples
///
/// ```
/// use riskreg_common::auth::inspector::decode_claims;
/// use riskreg_common::testing::fixtures::unsigned_token;
///
/// let token = unsigned_token(&serde_json::json!({ "sub": "analyst" }));
/// assert_eq!(decode_claims(&token).unwrap().sub.as_deref(), Some("analyst"));
/// ```
#[must_use]
pub fn unsigned_token(claims: &serde_json::Value) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        URL_SAFE_NO_PAD.encode("test-signature"),
    )
}

/// Access token whose `exp` is `ttl` from now (negative for already expired)
#[must_use]
pub fn token_expiring_in(ttl: chrono::Duration) -> String {
    token_for("analyst", ttl)
}

/// Access token for `sub` expiring `ttl` from now
#[must_use]
pub fn token_for(sub: &str, ttl: chrono::Duration) -> String {
    unsigned_token(&serde_json::json!({
        "sub": sub,
        "exp": (Utc::now() + ttl).timestamp(),
        "type": "access",
    }))
}
