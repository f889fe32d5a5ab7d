//! Constants shared by the session and transport layers.

/// Seconds before access-token expiry at which a proactive refresh kicks in.
pub const DEFAULT_REFRESH_LOOKAHEAD_SECS: u64 = 300;

/// Largest accepted refresh lookahead (one day).
pub const MAX_REFRESH_LOOKAHEAD_SECS: u64 = 86_400;

/// Upper bound on a single outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend base URL used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Keychain service name used when nothing is configured.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "RiskRegister.session";

