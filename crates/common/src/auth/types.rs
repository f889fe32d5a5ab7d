//! Session types and auth wire formats
//!
//! Wire structs mirror the backend's `/auth/*` routes. Token strings are
//! opaque to everything except [`super::inspector`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Credentials written together at login and cleared together at logout
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

impl SessionCredentials {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            username: username.into(),
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Claims carried in the access token payload
///
/// Only the fields the client reads; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,

    /// `access` or `refresh`
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

/// `POST /auth/login` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// `POST /auth/refresh` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/refresh` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

/// `GET /auth/verify` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub username: String,
}

/// `POST /auth/logout` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Session transitions broadcast to the hosting application
///
/// `Expired` is the cue to show the login surface; the client never
/// navigates on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
    Expired,
}

/// UI theme preference, persisted independently of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}
