//! Public-exposure discovery engine.
//!
//! Given an account and an optional explicit region set, the engine
//! enumerates every publicly reachable compute instance, load balancer, and
//! subnet and returns a deduplicated, byte-wise sorted identifier list per
//! request, together with the sorted list of regions actually scanned. The
//! scan is a pure read: nothing is cached, watched, or reconciled, and any
//! upstream failure aborts the whole request rather than dropping a region
//! silently.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::discovery::collector::{
    KIND_INSTANCES, KIND_LOAD_BALANCERS_V1, KIND_LOAD_BALANCERS_V2, KIND_SUBNETS, collect_paged,
    keep_instance, keep_load_balancer_v1, keep_load_balancer_v2, keep_subnet,
};
use crate::provider::CloudApi;

mod collector;
mod error;
#[cfg(test)]
mod tests;

pub use error::DiscoveryError;

/// Upper bound on concurrently scanned regions.
///
/// Regions are independent, so the fan-out is limited only to avoid tripping
/// upstream rate limits. Pagination inside one region and kind stays
/// sequential regardless.
const REGION_WORKERS: usize = 8;

/// Caller-facing resource kind selection.
///
/// The two load-balancer API generations are one logical category split only
/// by API version, so they are selected (and their results merged) as a
/// single kind.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResourceKind {
    /// Compute instances with an associated public address.
    ComputeInstances,
    /// Internet-facing load balancers of either API generation.
    LoadBalancers,
    /// Subnets that auto-assign public addresses at launch.
    Subnets,
}

impl ResourceKind {
    /// Every selectable kind, in scan order.
    pub const ALL: [Self; 3] = [Self::ComputeInstances, Self::LoadBalancers, Self::Subnets];

    /// Whether this kind's listing omits fully-qualified identifiers, forcing
    /// the engine to synthesize them from region and account identity.
    #[must_use]
    pub const fn synthesizes_identifiers(self) -> bool {
        matches!(self, Self::ComputeInstances | Self::LoadBalancers)
    }
}

/// Parameters of one discovery request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryRequest {
    /// Explicit region set to scan. `None` scans every region enabled for
    /// the account; an explicitly empty set is honoured literally and scans
    /// nothing.
    pub regions: Option<Vec<String>>,
    /// Resource kinds to discover.
    pub kinds: BTreeSet<ResourceKind>,
}

impl DiscoveryRequest {
    /// Builds a request covering every resource kind in every enabled region.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: None,
            kinds: ResourceKind::ALL.into_iter().collect(),
        }
    }

    /// Restricts the request to an explicit region set, honoured verbatim.
    #[must_use]
    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = Some(regions);
        self
    }

    /// Restricts the request to the given resource kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }
}

impl Default for DiscoveryRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate produced by one discovery request.
///
/// Both lists are sorted in byte-wise ascending order and free of duplicates,
/// so results from identical upstream data compare equal across invocations.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct DiscoveryResult {
    /// Canonical identifiers of every publicly exposed resource found.
    pub identifiers: Vec<String>,
    /// Regions actually scanned.
    pub regions: Vec<String>,
}

/// Runs discovery requests against a [`CloudApi`] implementation.
pub struct DiscoveryEngine<A> {
    api: A,
    region_workers: usize,
}

impl<A: CloudApi> DiscoveryEngine<A> {
    /// Creates an engine over the given cloud API binding.
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self {
            api,
            region_workers: REGION_WORKERS,
        }
    }

    /// Overrides the region fan-out width.
    ///
    /// This is primarily used by tests to force sequential scans.
    #[must_use]
    pub const fn with_region_workers(mut self, workers: usize) -> Self {
        self.region_workers = workers;
        self
    }

    /// Returns the sorted list of regions enabled for the account.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Regions`] when the enumeration call fails.
    pub async fn enabled_regions(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut regions = self
            .api
            .list_regions()
            .await
            .map_err(|err| DiscoveryError::Regions {
                message: err.to_string(),
            })?;
        regions.sort_unstable();
        regions.dedup();
        Ok(regions)
    }

    /// Runs one discovery request to completion.
    ///
    /// The request is all-or-nothing: any upstream failure aborts the whole
    /// scan and no identifiers from other regions are returned. Cancelling
    /// `cancel` aborts in-flight region tasks and pagination loops promptly.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when region resolution, identity
    /// resolution, or any region-scoped listing fails, or when the request is
    /// cancelled.
    pub async fn discover(
        &self,
        request: &DiscoveryRequest,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        let regions = self.resolve_regions(request.regions.as_deref()).await?;

        let needs_account = request
            .kinds
            .iter()
            .any(|kind| kind.synthesizes_identifiers());
        let account = if needs_account && !regions.is_empty() {
            Some(self.resolve_account().await?)
        } else {
            None
        };

        let collected: Vec<Vec<String>> = stream::iter(
            regions
                .iter()
                .map(|region| self.scan_region(region, &request.kinds, account.as_deref(), cancel)),
        )
        .buffer_unordered(self.region_workers.max(1))
        .try_collect()
        .await?;

        let mut identifiers: Vec<String> = collected.into_iter().flatten().collect();
        identifiers.sort_unstable();
        identifiers.dedup();

        let mut scanned = regions;
        scanned.sort_unstable();
        scanned.dedup();

        info!(
            identifiers = identifiers.len(),
            regions = scanned.len(),
            "discovery complete"
        );

        Ok(DiscoveryResult {
            identifiers,
            regions: scanned,
        })
    }

    /// Resolves the region set to scan: the explicit set verbatim (even when
    /// empty), otherwise every region enabled for the account.
    async fn resolve_regions(
        &self,
        explicit: Option<&[String]>,
    ) -> Result<Vec<String>, DiscoveryError> {
        match explicit {
            Some(regions) => Ok(regions.to_vec()),
            None => self
                .api
                .list_regions()
                .await
                .map_err(|err| DiscoveryError::Regions {
                    message: err.to_string(),
                }),
        }
    }

    async fn resolve_account(&self) -> Result<String, DiscoveryError> {
        self.api
            .caller_identity()
            .await
            .map_err(|err| DiscoveryError::Identity {
                message: err.to_string(),
            })
    }

    /// Collects every requested kind within one region.
    ///
    /// Kinds run sequentially: the upstream contract only guarantees cursor
    /// validity within a single listing sequence, and region-level fan-out
    /// already provides the useful parallelism.
    async fn scan_region(
        &self,
        region: &str,
        kinds: &BTreeSet<ResourceKind>,
        account: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, DiscoveryError> {
        let mut sink = Vec::new();

        for kind in kinds {
            match kind {
                ResourceKind::ComputeInstances => {
                    let account_id = required_account(account)?;
                    collect_paged(
                        KIND_INSTANCES,
                        region,
                        cancel,
                        |cursor| async move {
                            self.api.list_instances(region, cursor.as_ref()).await
                        },
                        |item| keep_instance(region, account_id, item),
                        &mut sink,
                    )
                    .await?;
                }
                ResourceKind::LoadBalancers => {
                    let account_id = required_account(account)?;
                    collect_paged(
                        KIND_LOAD_BALANCERS_V1,
                        region,
                        cancel,
                        |cursor| async move {
                            self.api
                                .list_load_balancers_v1(region, cursor.as_ref())
                                .await
                        },
                        |item| keep_load_balancer_v1(region, account_id, item),
                        &mut sink,
                    )
                    .await?;
                    collect_paged(
                        KIND_LOAD_BALANCERS_V2,
                        region,
                        cancel,
                        |cursor| async move {
                            self.api
                                .list_load_balancers_v2(region, cursor.as_ref())
                                .await
                        },
                        keep_load_balancer_v2,
                        &mut sink,
                    )
                    .await?;
                }
                ResourceKind::Subnets => {
                    collect_paged(
                        KIND_SUBNETS,
                        region,
                        cancel,
                        |cursor| async move {
                            self.api.list_public_subnets(region, cursor.as_ref()).await
                        },
                        keep_subnet,
                        &mut sink,
                    )
                    .await?;
                }
            }
        }

        Ok(sink)
    }
}

/// Unwraps the account identity resolved ahead of the fan-out.
///
/// The engine resolves identity before scanning whenever a requested kind
/// synthesizes identifiers, so a missing value here indicates a request
/// constructed outside [`DiscoveryEngine::discover`].
fn required_account(account: Option<&str>) -> Result<&str, DiscoveryError> {
    account.ok_or_else(|| DiscoveryError::Identity {
        message: String::from("account identity required to synthesize identifiers"),
    })
}
