//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use riskreg_domain::RiskRegError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RiskRegError);

impl From<InfraError> for RiskRegError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

/// Only client construction reaches this; request failures are mapped by
/// `ApiError::from_transport`, which knows the configured timeout.
impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_builder() {
            return Self(RiskRegError::Config(format!("invalid HTTP client setup: {value}")));
        }
        Self(RiskRegError::Network(value.to_string()))
    }
}
