//! Paginated collection of public resources, parameterized by resource kind.
//!
//! All four listings follow the same contract: call with a null cursor, keep
//! the items that satisfy the kind's public predicate, and repeat with the
//! returned cursor until the API stops producing one. Pagination within one
//! region and kind is strictly sequential because each cursor is derived from
//! the previous response.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::discovery::error::DiscoveryError;
use crate::provider::{
    InstanceSummary, LoadBalancerV1Summary, LoadBalancerV2Summary, Page, PageToken, ProviderError,
    SubnetSummary,
};

/// Scheme value marking a load balancer as reachable from the internet.
pub(crate) const INTERNET_FACING: &str = "internet-facing";

/// Kind label used in collection error messages.
pub(crate) const KIND_INSTANCES: &str = "compute instances";
/// Kind label used in collection error messages.
pub(crate) const KIND_LOAD_BALANCERS_V1: &str = "classic load balancers";
/// Kind label used in collection error messages.
pub(crate) const KIND_LOAD_BALANCERS_V2: &str = "load balancers";
/// Kind label used in collection error messages.
pub(crate) const KIND_SUBNETS: &str = "public subnets";

/// Drains one region-scoped listing, appending the identifier of every item
/// that passes the kind's public predicate to `sink`.
///
/// `fetch` issues one page request for the given cursor; `keep` applies the
/// predicate and produces the canonical identifier. The loop terminates only
/// when a response carries no follow-up cursor, so a listing that never
/// returns a terminal page would loop until cancelled.
pub(crate) async fn collect_paged<T, Fetch, Fut, Keep>(
    kind: &'static str,
    region: &str,
    cancel: &CancellationToken,
    mut fetch: Fetch,
    keep: Keep,
    sink: &mut Vec<String>,
) -> Result<(), DiscoveryError>
where
    Fetch: FnMut(Option<PageToken>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
    Keep: Fn(T) -> Option<String>,
{
    let mut token: Option<PageToken> = None;
    let mut page: u32 = 1;

    loop {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
            result = fetch(token.take()) => {
                result.map_err(|err| DiscoveryError::from_collection(err, kind, region, page))?
            }
        };

        for item in response.items {
            if let Some(identifier) = keep(item) {
                sink.push(identifier);
            }
        }

        match response.next_token {
            Some(next) => {
                token = Some(next);
                page += 1;
            }
            None => break,
        }
    }

    debug!(kind, region, pages = page, "listing exhausted");
    Ok(())
}

/// Applies the instance public predicate and synthesizes its identifier.
///
/// Instances expose no fully-qualified identifier in their listing, so one is
/// assembled from region, account, and the native instance id. An instance is
/// public when any public address is associated, including an elastic address
/// attached to an otherwise private instance.
pub(crate) fn keep_instance(region: &str, account: &str, item: InstanceSummary) -> Option<String> {
    item.public_ip.is_some().then(|| {
        format!(
            "instance/{region}/{account}/{id}",
            id = item.instance_id
        )
    })
}

/// Applies the v1 load balancer predicate and synthesizes its identifier.
///
/// The first-generation listing returns bare names, so the identifier is
/// assembled the same way as for instances.
pub(crate) fn keep_load_balancer_v1(
    region: &str,
    account: &str,
    item: LoadBalancerV1Summary,
) -> Option<String> {
    (item.scheme == INTERNET_FACING).then(|| {
        format!(
            "loadbalancer/{region}/{account}/{name}",
            name = item.name
        )
    })
}

/// Applies the v2 load balancer predicate; the native identifier passes
/// through untouched.
pub(crate) fn keep_load_balancer_v2(item: LoadBalancerV2Summary) -> Option<String> {
    (item.scheme == INTERNET_FACING).then_some(item.arn)
}

/// Applies the subnet predicate; the native identifier passes through
/// untouched.
pub(crate) fn keep_subnet(item: SubnetSummary) -> Option<String> {
    item.map_public_ip_on_launch.then_some(item.arn)
}
