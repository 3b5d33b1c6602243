//! Unit tests for the discovery engine.

use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::{DiscoveryEngine, DiscoveryError, DiscoveryRequest, ResourceKind, collector};
use crate::provider::ProviderError;
use crate::test_support::{
    OP_CALLER_IDENTITY, OP_LIST_INSTANCES, OP_LIST_REGIONS, ScriptedCloud, instance,
    load_balancer_v1, load_balancer_v2, page, subnet,
};

const ACCOUNT: &str = "123456789012";

fn engine(api: ScriptedCloud) -> DiscoveryEngine<ScriptedCloud> {
    DiscoveryEngine::new(api).with_region_workers(1)
}

fn request(regions: Option<&[&str]>, kinds: &[ResourceKind]) -> DiscoveryRequest {
    let mut built = DiscoveryRequest::new().with_kinds(kinds.iter().copied());
    if let Some(explicit) = regions {
        built = built.with_regions(explicit.iter().map(|region| (*region).to_owned()).collect());
    }
    built
}

#[tokio::test]
async fn explicit_region_set_skips_region_enumeration() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-west-1",
        Ok(page(vec![instance("i-1", Some("203.0.113.9"))], None)),
    );

    let result = engine(api.clone())
        .discover(
            &request(Some(&["us-west-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(result.regions, vec![String::from("us-west-1")]);
    assert_eq!(api.call_count(OP_LIST_REGIONS), 0);
}

#[tokio::test]
async fn empty_explicit_region_set_scans_nothing() {
    let api = ScriptedCloud::new();

    let result = engine(api.clone())
        .discover(
            &request(Some(&[]), &ResourceKind::ALL),
            &CancellationToken::new(),
        )
        .await
        .expect("empty scan should succeed");

    assert!(result.identifiers.is_empty());
    assert!(result.regions.is_empty());
    assert!(api.calls().is_empty(), "no provider call expected");
}

#[tokio::test]
async fn absent_region_set_scans_every_enabled_region() {
    let api = ScriptedCloud::new();
    api.push_regions(Ok(vec![
        String::from("us-west-2"),
        String::from("us-east-1"),
    ]));
    api.push_subnet_page("us-west-2", Ok(page(Vec::new(), None)));
    api.push_subnet_page("us-east-1", Ok(page(Vec::new(), None)));

    let result = engine(api)
        .discover(
            &request(None, &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.regions,
        vec![String::from("us-east-1"), String::from("us-west-2")]
    );
}

#[tokio::test]
async fn instance_identifiers_are_synthesized_from_region_and_account() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-abcdef", Some("203.0.113.7"))], None)),
    );

    let result = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![String::from("instance/us-east-1/123456789012/i-abcdef")]
    );
}

#[tokio::test]
async fn private_instances_never_appear_in_the_result() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-east-1",
        Ok(page(
            vec![
                instance("i-private", None),
                instance("i-public", Some("198.51.100.4")),
            ],
            None,
        )),
    );

    let result = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![String::from("instance/us-east-1/123456789012/i-public")]
    );
}

#[tokio::test]
async fn internal_load_balancers_are_filtered_from_both_generations() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_load_balancer_v1_page(
        "us-east-1",
        Ok(page(
            vec![
                load_balancer_v1("legacy-web", "internet-facing"),
                load_balancer_v1("legacy-db", "internal"),
            ],
            None,
        )),
    );
    api.push_load_balancer_v2_page(
        "us-east-1",
        Ok(page(
            vec![
                load_balancer_v2("arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/web/50dc6c", "internet-facing"),
                load_balancer_v2("arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/db/9e2f1a", "internal"),
            ],
            None,
        )),
    );

    let result = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::LoadBalancers]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![
            String::from("arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/web/50dc6c"),
            String::from("loadbalancer/us-east-1/123456789012/legacy-web"),
        ]
    );
}

#[tokio::test]
async fn non_public_subnets_are_filtered() {
    let api = ScriptedCloud::new();
    api.push_subnet_page(
        "eu-west-1",
        Ok(page(
            vec![
                subnet("arn:aws:ec2:eu-west-1:123456789012:subnet/subnet-pub", true),
                subnet("arn:aws:ec2:eu-west-1:123456789012:subnet/subnet-priv", false),
            ],
            None,
        )),
    );

    let result = engine(api)
        .discover(
            &request(Some(&["eu-west-1"]), &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![String::from(
            "arn:aws:ec2:eu-west-1:123456789012:subnet/subnet-pub"
        )]
    );
}

#[tokio::test]
async fn pagination_follows_every_cursor_until_exhaustion() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-1", Some("203.0.113.1"))], Some("p1"))),
    );
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-2", Some("203.0.113.2"))], Some("p2"))),
    );
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-3", Some("203.0.113.3"))], None)),
    );

    let result = engine(api.clone())
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(api.call_count(OP_LIST_INSTANCES), 3);
    let tokens: Vec<Option<String>> = api
        .calls()
        .iter()
        .filter(|call| call.operation == OP_LIST_INSTANCES)
        .map(|call| call.token.clone())
        .collect();
    assert_eq!(
        tokens,
        vec![None, Some(String::from("p1")), Some(String::from("p2"))]
    );
    assert_eq!(result.identifiers.len(), 3);
}

#[tokio::test]
async fn duplicate_identifiers_collapse_in_the_aggregate() {
    let api = ScriptedCloud::new();
    api.push_subnet_page(
        "us-east-1",
        Ok(page(
            vec![subnet("arn:aws:ec2:us-east-1:123456789012:subnet/subnet-1", true)],
            Some("next"),
        )),
    );
    api.push_subnet_page(
        "us-east-1",
        Ok(page(
            vec![subnet("arn:aws:ec2:us-east-1:123456789012:subnet/subnet-1", true)],
            None,
        )),
    );

    let result = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(result.identifiers.len(), 1);
}

#[tokio::test]
async fn identifiers_and_regions_sort_bytewise() {
    let api = ScriptedCloud::new();
    api.push_regions(Ok(vec![
        String::from("us-west-2"),
        String::from("ap-south-1"),
    ]));
    api.push_subnet_page(
        "us-west-2",
        Ok(page(vec![subnet("arn:zz", true), subnet("arn:aa", true)], None)),
    );
    api.push_subnet_page(
        "ap-south-1",
        Ok(page(vec![subnet("arn:mm", true)], None)),
    );

    let result = engine(api)
        .discover(
            &request(None, &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![
            String::from("arn:aa"),
            String::from("arn:mm"),
            String::from("arn:zz")
        ]
    );
    assert_eq!(
        result.regions,
        vec![String::from("ap-south-1"), String::from("us-west-2")]
    );
}

#[tokio::test]
async fn subnet_only_discovery_never_resolves_identity() {
    let api = ScriptedCloud::new();
    api.push_subnet_page("us-east-1", Ok(page(Vec::new(), None)));

    engine(api.clone())
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(api.call_count(OP_CALLER_IDENTITY), 0);
}

#[tokio::test]
async fn identity_is_resolved_once_for_many_regions() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page("us-east-1", Ok(page(Vec::new(), None)));
    api.push_instance_page("us-west-2", Ok(page(Vec::new(), None)));

    engine(api.clone())
        .discover(
            &request(
                Some(&["us-east-1", "us-west-2"]),
                &[ResourceKind::ComputeInstances],
            ),
            &CancellationToken::new(),
        )
        .await
        .expect("discovery should succeed");

    assert_eq!(api.call_count(OP_CALLER_IDENTITY), 1);
}

#[tokio::test]
async fn region_enumeration_failure_is_fatal() {
    let api = ScriptedCloud::new();
    api.push_regions(Err(ProviderError::unavailable(
        "ec2:DescribeRegions",
        "throttled",
    )));

    let err = engine(api)
        .discover(
            &request(None, &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect_err("discovery should fail");

    assert!(matches!(err, DiscoveryError::Regions { .. }));
}

#[tokio::test]
async fn identity_failure_is_fatal() {
    let api = ScriptedCloud::new();
    api.push_identity(Err(ProviderError::unavailable(
        "sts:GetCallerIdentity",
        "access denied",
    )));

    let err = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect_err("discovery should fail");

    assert!(matches!(err, DiscoveryError::Identity { .. }));
}

#[tokio::test]
async fn collection_failure_discards_results_from_other_regions() {
    let api = ScriptedCloud::new();
    api.push_subnet_page(
        "ap-south-1",
        Ok(page(vec![subnet("arn:aws:ec2:ap-south-1:123456789012:subnet/subnet-1", true)], None)),
    );
    api.push_subnet_page(
        "eu-west-1",
        Err(ProviderError::unavailable(
            "ec2:DescribeSubnets",
            "service unavailable",
        )),
    );

    let err = engine(api)
        .discover(
            &request(Some(&["ap-south-1", "eu-west-1"]), &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect_err("discovery should fail as a whole");

    let DiscoveryError::Collection { region, page: failed_page, .. } = err else {
        panic!("expected Collection error, got {err:?}");
    };
    assert_eq!(region, "eu-west-1");
    assert_eq!(failed_page, 1);
}

#[tokio::test]
async fn collection_errors_name_region_kind_and_page() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-1", Some("203.0.113.1"))], Some("p1"))),
    );
    api.push_instance_page(
        "us-east-1",
        Err(ProviderError::unavailable(
            "ec2:DescribeInstances",
            "throttled",
        )),
    );

    let err = engine(api)
        .discover(
            &request(Some(&["us-east-1"]), &[ResourceKind::ComputeInstances]),
            &CancellationToken::new(),
        )
        .await
        .expect_err("discovery should fail");

    let message = err.to_string();
    assert!(message.contains("us-east-1"), "message: {message}");
    assert!(message.contains("compute instances"), "message: {message}");
    assert!(message.contains("page 2"), "message: {message}");
}

#[tokio::test]
async fn unknown_region_failures_classify_as_invalid_region() {
    let api = ScriptedCloud::new();
    api.push_subnet_page(
        "mars-north-1",
        Err(ProviderError::invalid_region(
            "ec2:DescribeSubnets",
            "endpoint could not be reached",
        )),
    );

    let err = engine(api)
        .discover(
            &request(Some(&["mars-north-1"]), &[ResourceKind::Subnets]),
            &CancellationToken::new(),
        )
        .await
        .expect_err("discovery should fail");

    let DiscoveryError::InvalidRegion { region, .. } = err else {
        panic!("expected InvalidRegion error, got {err:?}");
    };
    assert_eq!(region, "mars-north-1");
}

#[tokio::test]
async fn identical_upstream_data_produces_identical_results() {
    let script = |api: &ScriptedCloud| {
        api.push_regions(Ok(vec![
            String::from("us-west-2"),
            String::from("us-east-1"),
        ]));
        api.push_subnet_page(
            "us-east-1",
            Ok(page(vec![subnet("arn:b", true), subnet("arn:a", true)], None)),
        );
        api.push_subnet_page("us-west-2", Ok(page(vec![subnet("arn:c", true)], None)));
    };

    let first_api = ScriptedCloud::new();
    script(&first_api);
    let second_api = ScriptedCloud::new();
    script(&second_api);

    let subnets_everywhere = request(None, &[ResourceKind::Subnets]);
    let first = engine(first_api)
        .discover(&subnets_everywhere, &CancellationToken::new())
        .await
        .expect("first discovery should succeed");
    let second = engine(second_api)
        .discover(&subnets_everywhere, &CancellationToken::new())
        .await
        .expect("second discovery should succeed");

    assert_eq!(first, second);
}

#[tokio::test]
async fn cancelled_token_aborts_before_any_provider_call() {
    let api = ScriptedCloud::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine(api.clone())
        .discover(&request(None, &ResourceKind::ALL), &cancel)
        .await
        .expect_err("discovery should abort");

    assert_eq!(err, DiscoveryError::Cancelled);
    assert!(api.calls().is_empty());
}

#[rstest]
#[case(Some("203.0.113.1"), true)]
#[case(None, false)]
fn instance_predicate_requires_public_address(#[case] ip: Option<&str>, #[case] kept: bool) {
    let summary = instance("i-1", ip);
    let identifier = collector::keep_instance("us-east-1", ACCOUNT, summary);
    assert_eq!(identifier.is_some(), kept);
}

#[rstest]
#[case("internet-facing", true)]
#[case("internal", false)]
#[case("", false)]
fn load_balancer_predicate_requires_internet_facing_scheme(
    #[case] scheme: &str,
    #[case] kept: bool,
) {
    let v1 = collector::keep_load_balancer_v1("us-east-1", ACCOUNT, load_balancer_v1("lb", scheme));
    let v2 = collector::keep_load_balancer_v2(load_balancer_v2("arn:lb", scheme));
    assert_eq!(v1.is_some(), kept);
    assert_eq!(v2.is_some(), kept);
}
