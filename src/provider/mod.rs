//! Cloud API abstraction consumed by the discovery engine.
//!
//! The trait mirrors the shape of the upstream list APIs: every listing call
//! is scoped to one region, returns at most one page of items, and hands back
//! an opaque cursor when more pages remain. Implementations own transport,
//! authentication, and decoding; the engine only sees typed summaries.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Opaque pagination cursor returned by a list API.
///
/// A cursor is only meaningful to the call sequence that produced it; the
/// engine threads it back into the next call for the same region and resource
/// kind and discards it once the API stops returning one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageToken(String);

impl PageToken {
    /// Wraps a raw cursor value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw cursor value for transmission upstream.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for PageToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PageToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One page of a region-scoped listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    /// Items carried by this page.
    pub items: Vec<T>,
    /// Cursor for the next page; `None` once the listing is exhausted.
    pub next_token: Option<PageToken>,
}

impl<T> Page<T> {
    /// Builds a page from items and an optional follow-up cursor.
    #[must_use]
    pub fn new(items: Vec<T>, next_token: Option<PageToken>) -> Self {
        Self { items, next_token }
    }

    /// Builds a terminal page with no follow-up cursor.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Compute instance as reported by the region-scoped instance listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSummary {
    /// Native instance identifier (for example `i-0abc123`).
    pub instance_id: String,
    /// Public network address, when one is associated.
    pub public_ip: Option<String>,
}

/// First-generation load balancer as reported by its listing API.
///
/// The v1 API returns only a bare name; fully-qualified identifiers must be
/// synthesized from region and account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadBalancerV1Summary {
    /// Native load balancer name.
    pub name: String,
    /// Addressing scheme (`internet-facing` or `internal`).
    pub scheme: String,
}

/// Second-generation load balancer as reported by its listing API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadBalancerV2Summary {
    /// Fully-qualified identifier returned directly by the API.
    pub arn: String,
    /// Addressing scheme (`internet-facing` or `internal`).
    pub scheme: String,
}

/// Subnet as reported by the region-scoped subnet listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubnetSummary {
    /// Fully-qualified identifier returned directly by the API.
    pub arn: String,
    /// Whether instances launched here receive a public address.
    pub map_public_ip_on_launch: bool,
}

/// Coarse classification of a provider failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderErrorKind {
    /// The upstream API could not be reached or answered unusably: transport
    /// failures, auth rejections, throttling, and malformed responses.
    Unavailable,
    /// The caller-supplied region is not recognised by the provider. Only
    /// detectable once a region-scoped call fails to resolve.
    InvalidRegion,
}

/// Failure reported by a [`CloudApi`] implementation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{operation}: {message}")]
pub struct ProviderError {
    /// Classification used by the engine's error taxonomy.
    pub kind: ProviderErrorKind,
    /// Upstream operation that failed (for example `ec2:DescribeInstances`).
    pub operation: String,
    /// Human-readable failure detail.
    pub message: String,
}

impl ProviderError {
    /// Builds an [`ProviderErrorKind::Unavailable`] error.
    #[must_use]
    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Builds an [`ProviderErrorKind::InvalidRegion`] error.
    #[must_use]
    pub fn invalid_region(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRegion,
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Future returned by cloud API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Region-scoped, paginated listing surface of the cloud provider.
///
/// Every listing call returns one page; callers loop until `next_token` comes
/// back `None`. A listing that never returns a terminal page is an upstream
/// contract violation the caller cannot detect.
pub trait CloudApi: Send + Sync {
    /// Enumerates every region enabled for the account.
    fn list_regions(&self) -> ApiFuture<'_, Vec<String>>;

    /// Resolves the canonical account identifier for the active credentials.
    fn caller_identity(&self) -> ApiFuture<'_, String>;

    /// Lists one page of compute instances in `region`.
    fn list_instances<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<InstanceSummary>>;

    /// Lists one page of first-generation load balancers in `region`.
    fn list_load_balancers_v1<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV1Summary>>;

    /// Lists one page of second-generation load balancers in `region`.
    fn list_load_balancers_v2<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV2Summary>>;

    /// Lists one page of subnets flagged to auto-assign public addresses in
    /// `region`.
    ///
    /// Implementations may push the attribute filter to the server; returned
    /// summaries still carry the attribute so callers can apply the public
    /// predicate uniformly.
    fn list_public_subnets<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<SubnetSummary>>;
}
