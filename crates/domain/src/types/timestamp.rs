//! Serde adapter for backend timestamps
//!
//! Row timestamps arrive either as RFC 3339 or as a naive ISO datetime that
//! is implicitly UTC. Both deserialize to `DateTime<Utc>`; serialization
//! always writes RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a backend timestamp
///
/// # Errors
/// Returns the naive-datetime parse error if neither form matches
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| raw.parse::<NaiveDateTime>().map(|t| t.and_utc()))
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}
