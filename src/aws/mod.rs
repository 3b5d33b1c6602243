//! AWS binding for the provider seam.
//!
//! Talks directly to the Query-protocol endpoints
//! (`https://<service>.<region>.amazonaws.com/`): each operation is a signed
//! form POST whose XML response decodes through the models in [`wire`]. No
//! retries, caching, or internal timeouts live here; callers own resilience
//! and deadline policy.

use chrono::Utc;
use serde::de::DeserializeOwned;
use reqwest::Url;

use crate::config::AwsConfig;
use crate::provider::{
    ApiFuture, CloudApi, InstanceSummary, LoadBalancerV1Summary, LoadBalancerV2Summary, Page,
    PageToken, ProviderError, SubnetSummary,
};
mod error;
mod sign;
mod wire;

use self::sign::{Credentials, REQUEST_CONTENT_TYPE, RequestToSign};

pub use error::AwsApiError;

const EC2_API_VERSION: &str = "2016-11-15";
const ELB_V1_API_VERSION: &str = "2012-06-01";
const ELB_V2_API_VERSION: &str = "2015-12-01";
const STS_API_VERSION: &str = "2011-06-15";

/// Production [`CloudApi`] implementation over the AWS Query APIs.
///
/// Region-less operations (region enumeration, caller identity) are issued
/// against the configured home region. When an endpoint override is set,
/// every call goes to that base URL instead of the per-region hosts; this is
/// how tests and API-compatible stacks are reached.
#[derive(Clone, Debug)]
pub struct AwsApi {
    http: reqwest::Client,
    credentials: Credentials,
    home_region: String,
    endpoint: Option<Url>,
}

impl AwsApi {
    /// Constructs a binding from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AwsApiError::Config`] when required credentials are missing,
    /// [`AwsApiError::Endpoint`] when the endpoint override does not parse,
    /// and [`AwsApiError::Client`] when the HTTP client cannot be built.
    pub fn new(config: &AwsConfig) -> Result<Self, AwsApiError> {
        config.validate()?;
        let endpoint = config
            .endpoint
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|err| AwsApiError::Endpoint(err.to_string()))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AwsApiError::Client(err.to_string()))?;

        Ok(Self {
            http,
            credentials: Credentials {
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                session_token: config.session_token.clone(),
            },
            home_region: config.home_region.clone(),
            endpoint,
        })
    }

    /// Resolves the request URL and the host value that participates in
    /// signing.
    fn service_url(&self, service: &str, region: &str) -> (String, String) {
        self.endpoint.as_ref().map_or_else(
            || {
                let host = format!("{service}.{region}.amazonaws.com");
                (format!("https://{host}/"), host)
            },
            |base| {
                let name = base.host_str().unwrap_or("localhost").to_owned();
                let authority = base
                    .port()
                    .map_or_else(|| name.clone(), |port| format!("{name}:{port}"));
                (base.to_string(), authority)
            },
        )
    }

    fn classify_transport(&self, operation: &str, err: &reqwest::Error) -> ProviderError {
        if self.endpoint.is_none() && err.is_connect() {
            ProviderError::invalid_region(
                operation,
                format!("endpoint could not be reached: {err}"),
            )
        } else {
            ProviderError::unavailable(operation, err.to_string())
        }
    }

    /// Issues one signed Query-protocol call and decodes its XML response.
    async fn query<T: DeserializeOwned>(
        &self,
        service: &str,
        action: &str,
        version: &str,
        region: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let operation = format!("{service}:{action}");
        let body = wire::query_body(action, version, params);
        let (url, host) = self.service_url(service, region);

        let timestamp = Utc::now();
        let signed = sign::sign(
            &RequestToSign {
                method: "POST",
                host: &host,
                path: "/",
                query: "",
                payload: &body,
            },
            &self.credentials,
            region,
            service,
            &timestamp,
        )
        .map_err(|err| ProviderError::unavailable(&operation, err.to_string()))?;

        let mut request = self
            .http
            .post(url)
            .header("content-type", REQUEST_CONTENT_TYPE)
            .header("x-amz-date", signed.amz_date.as_str())
            .header("authorization", signed.authorization.as_str());
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token.as_str());
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|err| self.classify_transport(&operation, &err))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            ProviderError::unavailable(&operation, format!("failed to read response body: {err}"))
        })?;

        if !status.is_success() {
            let detail = wire::error_summary(&text).unwrap_or_else(|| truncated(&text));
            return Err(ProviderError::unavailable(
                &operation,
                format!("HTTP {status}: {detail}"),
            ));
        }

        quick_xml::de::from_str::<T>(&text).map_err(|err| {
            ProviderError::unavailable(&operation, format!("failed to decode response: {err}"))
        })
    }
}

impl CloudApi for AwsApi {
    fn list_regions(&self) -> ApiFuture<'_, Vec<String>> {
        Box::pin(async move {
            let response: wire::DescribeRegionsResponse = self
                .query(
                    "ec2",
                    "DescribeRegions",
                    EC2_API_VERSION,
                    &self.home_region,
                    &[],
                )
                .await?;
            Ok(response
                .regions
                .items
                .into_iter()
                .map(|region| region.region_name)
                .collect())
        })
    }

    fn caller_identity(&self) -> ApiFuture<'_, String> {
        Box::pin(async move {
            let response: wire::GetCallerIdentityResponse = self
                .query(
                    "sts",
                    "GetCallerIdentity",
                    STS_API_VERSION,
                    &self.home_region,
                    &[],
                )
                .await?;
            Ok(response.result.account)
        })
    }

    fn list_instances<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<InstanceSummary>> {
        Box::pin(async move {
            let mut params = Vec::new();
            if let Some(cursor) = token {
                params.push(("NextToken", cursor.as_str()));
            }
            let response: wire::DescribeInstancesResponse = self
                .query("ec2", "DescribeInstances", EC2_API_VERSION, region, &params)
                .await?;
            let items = response
                .reservations
                .items
                .into_iter()
                .flat_map(|reservation| reservation.instances.items)
                .map(|instance| InstanceSummary {
                    instance_id: instance.instance_id,
                    public_ip: instance.ip_address,
                })
                .collect();
            Ok(Page::new(items, response.next_token.map(PageToken::from)))
        })
    }

    fn list_load_balancers_v1<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV1Summary>> {
        Box::pin(async move {
            let mut params = Vec::new();
            if let Some(cursor) = token {
                params.push(("Marker", cursor.as_str()));
            }
            let response: wire::DescribeLoadBalancersV1Response = self
                .query(
                    "elasticloadbalancing",
                    "DescribeLoadBalancers",
                    ELB_V1_API_VERSION,
                    region,
                    &params,
                )
                .await?;
            let items = response
                .result
                .load_balancers
                .members
                .into_iter()
                .map(|balancer| LoadBalancerV1Summary {
                    name: balancer.name,
                    scheme: balancer.scheme,
                })
                .collect();
            Ok(Page::new(
                items,
                response.result.next_marker.map(PageToken::from),
            ))
        })
    }

    fn list_load_balancers_v2<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<LoadBalancerV2Summary>> {
        Box::pin(async move {
            let mut params = Vec::new();
            if let Some(cursor) = token {
                params.push(("Marker", cursor.as_str()));
            }
            let response: wire::DescribeLoadBalancersV2Response = self
                .query(
                    "elasticloadbalancing",
                    "DescribeLoadBalancers",
                    ELB_V2_API_VERSION,
                    region,
                    &params,
                )
                .await?;
            let items = response
                .result
                .load_balancers
                .members
                .into_iter()
                .map(|balancer| LoadBalancerV2Summary {
                    arn: balancer.arn,
                    scheme: balancer.scheme,
                })
                .collect();
            Ok(Page::new(
                items,
                response.result.next_marker.map(PageToken::from),
            ))
        })
    }

    fn list_public_subnets<'a>(
        &'a self,
        region: &'a str,
        token: Option<&'a PageToken>,
    ) -> ApiFuture<'a, Page<SubnetSummary>> {
        Box::pin(async move {
            let mut params = vec![
                ("Filter.1.Name", "map-public-ip-on-launch"),
                ("Filter.1.Value.1", "true"),
            ];
            if let Some(cursor) = token {
                params.push(("NextToken", cursor.as_str()));
            }
            let response: wire::DescribeSubnetsResponse = self
                .query("ec2", "DescribeSubnets", EC2_API_VERSION, region, &params)
                .await?;
            let items = response
                .subnets
                .items
                .into_iter()
                .map(|subnet| SubnetSummary {
                    arn: subnet.subnet_arn,
                    map_public_ip_on_launch: subnet.map_public_ip_on_launch,
                })
                .collect();
            Ok(Page::new(items, response.next_token.map(PageToken::from)))
        })
    }
}

/// Clips an unrecognised failure body to a displayable length.
fn truncated(body: &str) -> String {
    const LIMIT: usize = 240;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_owned()
    } else {
        let mut clipped: String = trimmed.chars().take(LIMIT).collect();
        clipped.push_str("...");
        clipped
    }
}
