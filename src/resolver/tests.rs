//! Tests for endpoint resolution

use super::{EndpointResolver, ProbeEvent, ResolveStrategy};
use crate::test_support::FakeHealthChecker;
use crate::types::{Endpoint, NetworkProfile, NetworkRegistry};
use crate::X402Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn resolver(checker: FakeHealthChecker) -> EndpointResolver<FakeHealthChecker> {
    EndpointResolver::new(NetworkRegistry::builtin(), checker)
        .with_timeout(Duration::from_millis(50))
}

#[tokio::test]
async fn test_resolve_first_endpoint_healthy() {
    let checker = FakeHealthChecker::new().healthy("amforc").healthy("dwellir");
    let endpoint = resolver(checker.clone()).resolve("paseo").await.unwrap();

    assert_eq!(endpoint.id, "amforc");
    assert_eq!(checker.probed(), vec!["amforc"]);
}

#[tokio::test]
async fn test_resolve_fails_over_in_priority_order() {
    let checker = FakeHealthChecker::new().healthy("dotters").healthy("ibp");
    let endpoint = resolver(checker.clone()).resolve("paseo").await.unwrap();

    assert_eq!(endpoint.id, "ibp");
    assert_eq!(checker.probed(), vec!["amforc", "dwellir", "ibp"]);
}

#[tokio::test]
async fn test_sequential_probe_never_overlaps() {
    let checker = FakeHealthChecker::new()
        .delayed("amforc", Duration::from_millis(5))
        .delayed("dwellir", Duration::from_millis(5))
        .healthy("dotters");
    resolver(checker.clone()).resolve("paseo").await.unwrap();

    assert_eq!(
        checker.log(),
        vec![
            "start:amforc",
            "end:amforc",
            "start:dwellir",
            "end:dwellir",
            "start:ibp",
            "end:ibp",
            "start:dotters",
            "end:dotters",
        ]
    );
}

#[tokio::test]
async fn test_resolve_all_paseo_endpoints_down() {
    let checker = FakeHealthChecker::new()
        .delayed("amforc", Duration::from_secs(1))
        .delayed("dwellir", Duration::from_secs(1))
        .delayed("ibp", Duration::from_secs(1))
        .delayed("dotters", Duration::from_secs(1));
    let result = resolver(checker.clone()).resolve("paseo").await;

    match result {
        Err(X402Error::NoHealthyEndpoint { network, attempted }) => {
            assert_eq!(network, "Paseo Testnet");
            assert_eq!(attempted, 4);
        }
        other => panic!("expected NoHealthyEndpoint, got {:?}", other),
    }
    assert_eq!(checker.probed().len(), 4);
}

#[tokio::test]
async fn test_resolve_unknown_network() {
    let checker = FakeHealthChecker::new().healthy("amforc");
    let result = resolver(checker.clone()).resolve("kusama").await;

    assert!(matches!(result, Err(X402Error::UnknownNetwork { network }) if network == "kusama"));
    assert!(checker.probed().is_empty());
}

#[tokio::test]
async fn test_resolved_endpoint_belongs_to_profile() {
    let registry = NetworkRegistry::builtin();
    let checker = FakeHealthChecker::new()
        .healthy("amforc")
        .healthy("parity")
        .healthy("dwellir");
    let resolver = EndpointResolver::new(registry.clone(), checker);

    for id in ["paseo", "westend", "polkadot"] {
        let endpoint = resolver.resolve(id).await.unwrap();
        assert!(registry.profile(id).unwrap().contains(&endpoint));
    }
}

#[tokio::test]
async fn test_resolve_does_not_cache() {
    let registry = NetworkRegistry::new().with_profile(
        NetworkProfile::new(
            "local",
            "Local",
            vec![
                Endpoint::new("a", "ws://10.0.0.1:9944", "A"),
                Endpoint::new("b", "ws://10.0.0.2:9944", "B"),
            ],
            "https://explorer.local",
        )
        .unwrap(),
    );
    let checker = FakeHealthChecker::new().healthy("b");
    let resolver = EndpointResolver::new(registry, checker.clone());

    resolver.resolve("local").await.unwrap();
    resolver.resolve("local").await.unwrap();

    assert_eq!(checker.probed(), vec!["a", "b", "a", "b"]);
}

#[tokio::test]
async fn test_parallel_prefers_lowest_index() {
    // dwellir answers first but amforc has priority
    let checker = FakeHealthChecker::new()
        .healthy("amforc")
        .healthy("dwellir")
        .delayed("amforc", Duration::from_millis(30));
    let endpoint = resolver(checker.clone())
        .with_strategy(ResolveStrategy::Parallel)
        .resolve("paseo")
        .await
        .unwrap();

    assert_eq!(endpoint.id, "amforc");
    assert_eq!(checker.probed().len(), 4);
}

#[tokio::test]
async fn test_parallel_all_down() {
    let result = resolver(FakeHealthChecker::new())
        .with_strategy(ResolveStrategy::Parallel)
        .resolve("westend")
        .await;

    assert!(matches!(
        result,
        Err(X402Error::NoHealthyEndpoint { attempted: 2, .. })
    ));
}

#[tokio::test]
async fn test_observer_receives_probe_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let checker = FakeHealthChecker::new().healthy("amforc");

    let endpoint = EndpointResolver::new(NetworkRegistry::builtin(), checker)
        .with_observer(move |event| sink.lock().unwrap().push(event.clone()))
        .resolve("westend")
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(endpoint.id, "amforc");
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ProbeEvent::Checking { endpoint } if endpoint.id == "parity"));
    assert!(matches!(&events[1], ProbeEvent::Unhealthy { endpoint } if endpoint.id == "parity"));
    assert!(matches!(&events[2], ProbeEvent::Checking { endpoint } if endpoint.id == "amforc"));
    assert!(matches!(&events[3], ProbeEvent::Healthy { endpoint } if endpoint.id == "amforc"));
}

#[test]
fn test_strategy_from_str() {
    assert_eq!(
        "parallel".parse::<ResolveStrategy>().unwrap(),
        ResolveStrategy::Parallel
    );
    assert_eq!(
        "Sequential".parse::<ResolveStrategy>().unwrap(),
        ResolveStrategy::Sequential
    );
    assert!("random".parse::<ResolveStrategy>().is_err());
}
