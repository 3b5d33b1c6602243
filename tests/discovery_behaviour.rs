//! Behavioural tests for the discovery engine through the public API.

use tokio_util::sync::CancellationToken;

use varta::test_support::{
    OP_CALLER_IDENTITY, OP_LIST_INSTANCES, OP_LIST_LOAD_BALANCERS_V1, OP_LIST_LOAD_BALANCERS_V2,
    OP_LIST_PUBLIC_SUBNETS, ScriptedCloud, instance, load_balancer_v1, load_balancer_v2, page,
    subnet,
};
use varta::{DiscoveryEngine, DiscoveryError, DiscoveryRequest, ProviderError, ResourceKind};

const ACCOUNT: &str = "123456789012";

/// Scripts a two-region account with one public resource of every kind.
fn seeded_account() -> ScriptedCloud {
    let api = ScriptedCloud::new();
    api.push_regions(Ok(vec![
        String::from("us-west-2"),
        String::from("us-east-1"),
    ]));
    api.push_identity(Ok(String::from(ACCOUNT)));

    for region in ["us-east-1", "us-west-2"] {
        api.push_load_balancer_v1_page(region, Ok(page(Vec::new(), None)));
        api.push_load_balancer_v2_page(region, Ok(page(Vec::new(), None)));
        api.push_subnet_page(region, Ok(page(Vec::new(), None)));
    }

    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-east", Some("203.0.113.10"))], None)),
    );
    api.push_instance_page(
        "us-west-2",
        Ok(page(vec![instance("i-west", Some("203.0.113.20"))], None)),
    );
    api
}

#[tokio::test]
async fn full_discovery_walks_every_region_and_kind() {
    let api = seeded_account();
    let engine = DiscoveryEngine::new(api.clone()).with_region_workers(1);

    let result = engine
        .discover(&DiscoveryRequest::new(), &CancellationToken::new())
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![
            String::from("instance/us-east-1/123456789012/i-east"),
            String::from("instance/us-west-2/123456789012/i-west"),
        ]
    );
    assert_eq!(
        result.regions,
        vec![String::from("us-east-1"), String::from("us-west-2")]
    );

    assert_eq!(api.call_count(OP_CALLER_IDENTITY), 1);
    assert_eq!(api.call_count(OP_LIST_INSTANCES), 2);
    assert_eq!(api.call_count(OP_LIST_LOAD_BALANCERS_V1), 2);
    assert_eq!(api.call_count(OP_LIST_LOAD_BALANCERS_V2), 2);
    assert_eq!(api.call_count(OP_LIST_PUBLIC_SUBNETS), 2);
}

#[tokio::test]
async fn both_load_balancer_generations_merge_into_one_listing() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_load_balancer_v1_page(
        "us-east-1",
        Ok(page(
            vec![load_balancer_v1("legacy-web", "internet-facing")],
            None,
        )),
    );
    api.push_load_balancer_v2_page(
        "us-east-1",
        Ok(page(
            vec![load_balancer_v2(
                "arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/web/50dc6c",
                "internet-facing",
            )],
            None,
        )),
    );

    let engine = DiscoveryEngine::new(api);
    let request = DiscoveryRequest::new()
        .with_regions(vec![String::from("us-east-1")])
        .with_kinds([ResourceKind::LoadBalancers]);

    let result = engine
        .discover(&request, &CancellationToken::new())
        .await
        .expect("discovery should succeed");

    assert_eq!(
        result.identifiers,
        vec![
            String::from(
                "arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/web/50dc6c"
            ),
            String::from("loadbalancer/us-east-1/123456789012/legacy-web"),
        ]
    );
}

#[tokio::test]
async fn one_failing_region_discards_the_whole_result() {
    let api = ScriptedCloud::new();
    api.push_identity(Ok(String::from(ACCOUNT)));
    api.push_instance_page(
        "us-east-1",
        Ok(page(vec![instance("i-east", Some("203.0.113.10"))], None)),
    );
    api.push_instance_page(
        "us-west-2",
        Err(ProviderError::unavailable(
            "ec2:DescribeInstances",
            "internal error",
        )),
    );

    let engine = DiscoveryEngine::new(api).with_region_workers(1);
    let request = DiscoveryRequest::new()
        .with_regions(vec![String::from("us-east-1"), String::from("us-west-2")])
        .with_kinds([ResourceKind::ComputeInstances]);

    let err = engine
        .discover(&request, &CancellationToken::new())
        .await
        .expect_err("discovery must fail as a whole");

    assert!(matches!(err, DiscoveryError::Collection { .. }));
}

#[tokio::test]
async fn parallel_region_fanout_matches_the_sequential_result() {
    let sequential = DiscoveryEngine::new(seeded_account()).with_region_workers(1);
    let parallel = DiscoveryEngine::new(seeded_account()).with_region_workers(8);
    let request = DiscoveryRequest::new();

    let expected = sequential
        .discover(&request, &CancellationToken::new())
        .await
        .expect("sequential discovery should succeed");
    let actual = parallel
        .discover(&request, &CancellationToken::new())
        .await
        .expect("parallel discovery should succeed");

    assert_eq!(expected, actual);
}
