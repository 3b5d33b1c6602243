//! Error taxonomy for the discovery engine.

use thiserror::Error;

use crate::provider::{ProviderError, ProviderErrorKind};

/// Errors surfaced by a discovery request.
///
/// Every variant is fatal to the enclosing request: the engine never returns
/// a partial result, and never retries on the caller's behalf.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DiscoveryError {
    /// Raised when the enabled-region enumeration fails. An incomplete region
    /// list would silently under-report public exposure, so no fallback is
    /// attempted.
    #[error("failed to enumerate enabled regions: {message}")]
    Regions {
        /// Upstream failure detail.
        message: String,
    },
    /// Raised when the account-identity lookup fails.
    #[error("failed to resolve account identity: {message}")]
    Identity {
        /// Upstream failure detail.
        message: String,
    },
    /// Raised when a region-scoped listing call fails. Identifies the region,
    /// resource kind, and pagination step so the failing upstream call can be
    /// pinpointed from the message alone.
    #[error("failed to list {kind} in region {region} (page {page}): {message}")]
    Collection {
        /// Resource kind being collected.
        kind: String,
        /// Region whose listing failed.
        region: String,
        /// 1-based pagination step that failed.
        page: u32,
        /// Upstream failure detail.
        message: String,
    },
    /// Raised when the provider reports a caller-supplied region it does not
    /// recognise.
    #[error("region {region} is not recognised by the provider: {message}")]
    InvalidRegion {
        /// Offending region name.
        region: String,
        /// Upstream failure detail.
        message: String,
    },
    /// Raised when the request's cancellation signal fires before the scan
    /// completes.
    #[error("discovery cancelled before completion")]
    Cancelled,
}

impl DiscoveryError {
    /// Maps a seam-level failure from a collection call into the engine
    /// taxonomy, preserving region/kind/page context.
    #[must_use]
    pub(crate) fn from_collection(
        error: ProviderError,
        kind: &str,
        region: &str,
        page: u32,
    ) -> Self {
        match error.kind {
            ProviderErrorKind::InvalidRegion => Self::InvalidRegion {
                region: region.to_owned(),
                message: error.to_string(),
            },
            ProviderErrorKind::Unavailable => Self::Collection {
                kind: kind.to_owned(),
                region: region.to_owned(),
                page,
                message: error.to_string(),
            },
        }
    }
}
