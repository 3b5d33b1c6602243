//! Error types for constructing the AWS binding.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while constructing the AWS binding.
///
/// Failures during API calls are reported through the provider seam as
/// [`crate::provider::ProviderError`] values instead.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AwsApiError {
    /// Raised when the supplied configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the endpoint override is not a valid URL.
    #[error("invalid endpoint override: {0}")]
    Endpoint(String),
    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to construct HTTP client: {0}")]
    Client(String),
}

impl From<ConfigError> for AwsApiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
