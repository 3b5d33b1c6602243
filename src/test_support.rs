//! Test support utilities shared across unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::provider::{
    ApiFuture, CloudApi, InstanceSummary, LoadBalancerV1Summary, LoadBalancerV2Summary, Page,
    PageToken, ProviderError, SubnetSummary,
};

/// Operation label recorded for region-enumeration calls.
pub const OP_LIST_REGIONS: &str = "ListRegions";
/// Operation label recorded for caller-identity calls.
pub const OP_CALLER_IDENTITY: &str = "CallerIdentity";
/// Operation label recorded for instance listing calls.
pub const OP_LIST_INSTANCES: &str = "ListInstances";
/// Operation label recorded for first-generation load balancer listing calls.
pub const OP_LIST_LOAD_BALANCERS_V1: &str = "ListLoadBalancersV1";
/// Operation label recorded for second-generation load balancer listing calls.
pub const OP_LIST_LOAD_BALANCERS_V2: &str = "ListLoadBalancersV2";
/// Operation label recorded for subnet listing calls.
pub const OP_LIST_PUBLIC_SUBNETS: &str = "ListPublicSubnets";

/// Records a single invocation made through [`ScriptedCloud`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiCall {
    /// Operation label (one of the `OP_*` constants).
    pub operation: String,
    /// Region the call was scoped to, when any.
    pub region: Option<String>,
    /// Cursor passed by the caller, when any.
    pub token: Option<String>,
}

type PageScript<T> = HashMap<String, VecDeque<Result<Page<T>, ProviderError>>>;

#[derive(Debug, Default)]
struct Inner {
    regions: VecDeque<Result<Vec<String>, ProviderError>>,
    identities: VecDeque<Result<String, ProviderError>>,
    instance_pages: PageScript<InstanceSummary>,
    load_balancer_v1_pages: PageScript<LoadBalancerV1Summary>,
    load_balancer_v2_pages: PageScript<LoadBalancerV2Summary>,
    subnet_pages: PageScript<SubnetSummary>,
    calls: Vec<ApiCall>,
}

/// Scripted cloud API double that returns pre-seeded responses in FIFO order
/// per operation and region.
///
/// Used to drive deterministic discovery outcomes without network access. An
/// exhausted script yields an upstream-unavailable error, so a test that
/// forgets to seed a page fails loudly instead of hanging.
#[derive(Clone, Debug, Default)]
pub struct ScriptedCloud {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedCloud {
    /// Creates a double with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a response for the next region-enumeration call.
    pub fn push_regions(&self, response: Result<Vec<String>, ProviderError>) {
        self.lock().regions.push_back(response);
    }

    /// Queues a response for the next caller-identity call.
    pub fn push_identity(&self, response: Result<String, ProviderError>) {
        self.lock().identities.push_back(response);
    }

    /// Queues a response for the next instance listing call in `region`.
    pub fn push_instance_page(
        &self,
        region: &str,
        response: Result<Page<InstanceSummary>, ProviderError>,
    ) {
        self.lock()
            .instance_pages
            .entry(region.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Queues a response for the next first-generation load balancer listing
    /// call in `region`.
    pub fn push_load_balancer_v1_page(
        &self,
        region: &str,
        response: Result<Page<LoadBalancerV1Summary>, ProviderError>,
    ) {
        self.lock()
            .load_balancer_v1_pages
            .entry(region.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Queues a response for the next second-generation load balancer listing
    /// call in `region`.
    pub fn push_load_balancer_v2_page(
        &self,
        region: &str,
        response: Result<Page<LoadBalancerV2Summary>, ProviderError>,
    ) {
        self.lock()
            .load_balancer_v2_pages
            .entry(region.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Queues a response for the next subnet listing call in `region`.
    pub fn push_subnet_page(
        &self,
        region: &str,
        response: Result<Page<SubnetSummary>, ProviderError>,
    ) {
        self.lock()
            .subnet_pages
            .entry(region.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Counts recorded invocations of one operation.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn record(&self, operation: &str, region: Option<&str>, token: Option<&PageToken>) {
        self.lock().calls.push(ApiCall {
            operation: operation.to_owned(),
            region: region.map(str::to_owned),
            token: token.map(|cursor| cursor.as_str().to_owned()),
        });
    }
}

fn exhausted<T>(operation: &str) -> Result<T, ProviderError> {
    Err(ProviderError::unavailable(
        operation,
        "no scripted response available",
    ))
}

fn next_page<T>(
    script: &mut PageScript<T>,
    operation: &str,
    region: &str,
) -> Result<Page<T>, ProviderError> {
    script
        .get_mut(region)
        .and_then(VecDeque::pop_front)
        .unwrap_or_else(|| exhausted(operation))
}

impl CloudApi for ScriptedCloud {
    fn list_regions(&self) -> ApiFuture<'_, Vec<String>> {
        self.record(OP_LIST_REGIONS, None, None);
        let response = self
            .lock()
            .regions
            .pop_front()
            .unwrap_or_else(|| exhausted(OP_LIST_REGIONS));
        Box::pin(async move { response })
    }

    fn caller_identity(&self) -> ApiFuture<'_, String> {
        self.record(OP_CALLER_IDENTITY, None, None);
        let response = self
            .lock()
            .identities
            .pop_front()
            .unwrap_or_else(|| exhausted(OP_CALLER_IDENTITY));
        Box::pin(async move { response })
    }

    fn list_instances<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<InstanceSummary>> {
        self.record(OP_LIST_INSTANCES, Some(region), token);
        let response = next_page(&mut self.lock().instance_pages, OP_LIST_INSTANCES, region);
        Box::pin(async move { response })
    }

    fn list_load_balancers_v1<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV1Summary>> {
        self.record(OP_LIST_LOAD_BALANCERS_V1, Some(region), token);
        let response = next_page(
            &mut self.lock().load_balancer_v1_pages,
            OP_LIST_LOAD_BALANCERS_V1,
            region,
        );
        Box::pin(async move { response })
    }

    fn list_load_balancers_v2<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV2Summary>> {
        self.record(OP_LIST_LOAD_BALANCERS_V2, Some(region), token);
        let response = next_page(
            &mut self.lock().load_balancer_v2_pages,
            OP_LIST_LOAD_BALANCERS_V2,
            region,
        );
        Box::pin(async move { response })
    }

    fn list_public_subnets<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<SubnetSummary>> {
        self.record(OP_LIST_PUBLIC_SUBNETS, Some(region), token);
        let response = next_page(&mut self.lock().subnet_pages, OP_LIST_PUBLIC_SUBNETS, region);
        Box::pin(async move { response })
    }
}

/// Builds an instance summary for scripting.
#[must_use]
pub fn instance(id: &str, public_ip: Option<&str>) -> InstanceSummary {
    InstanceSummary {
        instance_id: id.to_owned(),
        public_ip: public_ip.map(str::to_owned),
    }
}

/// Builds a first-generation load balancer summary for scripting.
#[must_use]
pub fn load_balancer_v1(name: &str, scheme: &str) -> LoadBalancerV1Summary {
    LoadBalancerV1Summary {
        name: name.to_owned(),
        scheme: scheme.to_owned(),
    }
}

/// Builds a second-generation load balancer summary for scripting.
#[must_use]
pub fn load_balancer_v2(arn: &str, scheme: &str) -> LoadBalancerV2Summary {
    LoadBalancerV2Summary {
        arn: arn.to_owned(),
        scheme: scheme.to_owned(),
    }
}

/// Builds a subnet summary for scripting.
#[must_use]
pub fn subnet(arn: &str, public: bool) -> SubnetSummary {
    SubnetSummary {
        arn: arn.to_owned(),
        map_public_ip_on_launch: public,
    }
}

/// Builds a page with an optional follow-up cursor for scripting.
#[must_use]
pub fn page<T>(items: Vec<T>, next: Option<&str>) -> Page<T> {
    Page::new(items, next.map(PageToken::from))
}
