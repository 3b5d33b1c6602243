//! Query-protocol request assembly and XML response models.
//!
//! The EC2 API wraps list elements in `item` children with camelCase names;
//! the ELB and STS APIs use PascalCase names with `member` children. Both
//! shapes deserialize through the small wrapper types below so the rest of
//! the binding works with plain vectors.

use serde::Deserialize;

/// EC2-style list container (`<x><item>..</item><item>..</item></x>`).
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct XmlItems<T> {
    /// Child elements of the list.
    #[serde(default, rename = "item")]
    pub items: Vec<T>,
}

impl<T> Default for XmlItems<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Query-style list container (`<x><member>..</member>..</x>`).
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct XmlMembers<T> {
    /// Child elements of the list.
    #[serde(default, rename = "member")]
    pub members: Vec<T>,
}

impl<T> Default for XmlMembers<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

/// `DescribeInstances` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeInstancesResponse {
    #[serde(default, rename = "reservationSet")]
    pub reservations: XmlItems<ReservationItem>,
    #[serde(rename = "nextToken")]
    pub next_token: Option<String>,
}

/// One reservation grouping instances in a `DescribeInstances` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ReservationItem {
    #[serde(default, rename = "instancesSet")]
    pub instances: XmlItems<Ec2InstanceItem>,
}

/// One instance within a reservation.
#[derive(Debug, Deserialize)]
pub(crate) struct Ec2InstanceItem {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(rename = "ipAddress")]
    pub ip_address: Option<String>,
}

/// `DescribeRegions` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeRegionsResponse {
    #[serde(default, rename = "regionInfo")]
    pub regions: XmlItems<RegionItem>,
}

/// One region entry in a `DescribeRegions` response.
#[derive(Debug, Deserialize)]
pub(crate) struct RegionItem {
    #[serde(rename = "regionName")]
    pub region_name: String,
}

/// `DescribeSubnets` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeSubnetsResponse {
    #[serde(default, rename = "subnetSet")]
    pub subnets: XmlItems<SubnetItem>,
    #[serde(rename = "nextToken")]
    pub next_token: Option<String>,
}

/// One subnet entry in a `DescribeSubnets` response.
#[derive(Debug, Deserialize)]
pub(crate) struct SubnetItem {
    #[serde(default, rename = "mapPublicIpOnLaunch")]
    pub map_public_ip_on_launch: bool,
    #[serde(rename = "subnetArn")]
    pub subnet_arn: String,
}

/// First-generation `DescribeLoadBalancers` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeLoadBalancersV1Response {
    #[serde(rename = "DescribeLoadBalancersResult")]
    pub result: LoadBalancersV1Result,
}

/// Result element of the first-generation listing.
#[derive(Debug, Deserialize)]
pub(crate) struct LoadBalancersV1Result {
    #[serde(default, rename = "LoadBalancerDescriptions")]
    pub load_balancers: XmlMembers<LoadBalancerV1Item>,
    #[serde(rename = "NextMarker")]
    pub next_marker: Option<String>,
}

/// One load balancer description in the first-generation listing.
#[derive(Debug, Deserialize)]
pub(crate) struct LoadBalancerV1Item {
    #[serde(rename = "LoadBalancerName")]
    pub name: String,
    #[serde(default, rename = "Scheme")]
    pub scheme: String,
}

/// Second-generation `DescribeLoadBalancers` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DescribeLoadBalancersV2Response {
    #[serde(rename = "DescribeLoadBalancersResult")]
    pub result: LoadBalancersV2Result,
}

/// Result element of the second-generation listing.
#[derive(Debug, Deserialize)]
pub(crate) struct LoadBalancersV2Result {
    #[serde(default, rename = "LoadBalancers")]
    pub load_balancers: XmlMembers<LoadBalancerV2Item>,
    #[serde(rename = "NextMarker")]
    pub next_marker: Option<String>,
}

/// One load balancer in the second-generation listing.
#[derive(Debug, Deserialize)]
pub(crate) struct LoadBalancerV2Item {
    #[serde(rename = "LoadBalancerArn")]
    pub arn: String,
    #[serde(default, rename = "Scheme")]
    pub scheme: String,
}

/// `GetCallerIdentity` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GetCallerIdentityResponse {
    #[serde(rename = "GetCallerIdentityResult")]
    pub result: CallerIdentityResult,
}

/// Result element of the caller-identity lookup.
#[derive(Debug, Deserialize)]
pub(crate) struct CallerIdentityResult {
    #[serde(rename = "Account")]
    pub account: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

impl ErrorBody {
    fn render(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }
}

/// Query-protocol error envelope (`<ErrorResponse><Error>..`).
#[derive(Debug, Deserialize)]
struct QueryErrorResponse {
    #[serde(rename = "Error")]
    error: ErrorBody,
}

/// EC2 error envelope (`<Response><Errors><Error>..`).
#[derive(Debug, Deserialize)]
struct Ec2ErrorResponse {
    #[serde(rename = "Errors")]
    errors: Ec2Errors,
}

#[derive(Debug, Deserialize)]
struct Ec2Errors {
    #[serde(rename = "Error")]
    error: ErrorBody,
}

/// Extracts `Code: Message` from a failure body when it matches either known
/// error envelope.
pub(crate) fn error_summary(body: &str) -> Option<String> {
    if let Ok(response) = quick_xml::de::from_str::<QueryErrorResponse>(body) {
        return response.error.render();
    }
    quick_xml::de::from_str::<Ec2ErrorResponse>(body)
        .ok()
        .and_then(|response| response.errors.error.render())
}

/// Renders a Query-protocol form body for `action` with extra parameters.
pub(crate) fn query_body(action: &str, version: &str, params: &[(&str, &str)]) -> String {
    let mut body = format!(
        "Action={}&Version={}",
        urlencoding::encode(action),
        urlencoding::encode(version)
    );
    for (key, value) in params {
        body.push('&');
        body.push_str(&urlencoding::encode(key));
        body.push('=');
        body.push_str(&urlencoding::encode(value));
    }
    body
}
