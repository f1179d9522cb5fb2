use super::*;
use crate::{
    adapter::{AdapterConfig, ArgValue, Support},
    error::ErrorClass,
    test_support::FixtureFactory,
};
use std::collections::BTreeMap;

fn scripted(name: &'static str, fast: Support, slow: Support) -> Arc<FixtureFactory> {
    Arc::new(FixtureFactory::scripted(name, fast, slow))
}

fn names(set: &AdapterSet) -> Vec<&str> {
    set.names().collect()
}

///
/// REGISTRATION
///

#[test]
fn restricted_registry_refuses_second_implementation() {
    let registry = AdapterRegistry::restricted();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("first registration should succeed");

    let err = registry
        .register(scripted("memory", Support::No, Support::No))
        .expect_err("second implementation under one name should fail");

    assert_eq!(err.class, ErrorClass::DuplicateAdapterName);
    assert_eq!(registry.names(), vec!["memory".to_string()]);
}

#[test]
fn unrestricted_registry_keeps_both_implementations() {
    let registry = AdapterRegistry::new();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("first registration should succeed");
    registry
        .register(scripted("memory", Support::No, Support::No))
        .expect("unrestricted registry should accept a duplicate name");

    assert_eq!(registry.names(), vec!["memory".to_string()]);
    assert_eq!(registry.entries.read().len(), 2);
}

#[test]
fn registering_the_same_factory_twice_is_a_no_op() {
    let registry = AdapterRegistry::restricted();
    let factory: Arc<dyn AdapterFactory> = scripted("memory", Support::Yes, Support::Yes);

    registry.register(Arc::clone(&factory)).expect("registration should succeed");
    registry
        .register(factory)
        .expect("re-registering the same factory should succeed");

    assert_eq!(registry.entries.read().len(), 1);
}

///
/// LOADING
///

#[test]
fn safe_load_without_allow_list_loads_nothing() {
    let registry = AdapterRegistry::new();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("registration should succeed");

    let set = registry.load(None, true).expect("safe load should succeed");
    assert!(set.is_empty());
}

#[test]
fn safe_load_skips_unsafe_adapters() {
    let registry = AdapterRegistry::new();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("registration should succeed");
    registry
        .register(Arc::new(FixtureFactory::scripted("files", Support::Yes, Support::Yes).unsafe_adapter()))
        .expect("registration should succeed");

    let allow = vec!["memory".to_string(), "files".to_string()];
    let set = registry.load(Some(&allow), true).expect("safe load should succeed");

    assert_eq!(names(&set), vec!["memory"]);
}

#[test]
fn safe_load_refuses_ambiguous_names() {
    let registry = AdapterRegistry::new();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("registration should succeed");
    registry
        .register(scripted("memory", Support::No, Support::No))
        .expect("registration should succeed");

    let allow = vec!["memory".to_string()];
    let err = registry
        .load(Some(&allow), true)
        .expect_err("safe load of an ambiguous name should fail");

    assert_eq!(err.class, ErrorClass::DuplicateAdapterName);
}

#[test]
fn unsafe_load_takes_everything_and_first_implementation_wins() {
    let registry = AdapterRegistry::new();
    let first: Arc<dyn AdapterFactory> = scripted("memory", Support::Yes, Support::Yes);
    registry.register(Arc::clone(&first)).expect("registration should succeed");
    registry
        .register(scripted("memory", Support::No, Support::No))
        .expect("registration should succeed");
    registry
        .register(Arc::new(FixtureFactory::scripted("files", Support::No, Support::No).unsafe_adapter()))
        .expect("registration should succeed");

    let set = registry.load(None, false).expect("unsafe load should succeed");

    assert_eq!(names(&set), vec!["memory", "files"]);
    let loaded = set.get("memory").expect("memory should be loaded");
    assert!(std::ptr::addr_eq(Arc::as_ptr(loaded), Arc::as_ptr(&first)));
}

#[test]
fn allow_list_limits_unsafe_load() {
    let registry = AdapterRegistry::new();
    registry
        .register(scripted("memory", Support::Yes, Support::Yes))
        .expect("registration should succeed");
    registry
        .register(scripted("generator", Support::Yes, Support::Yes))
        .expect("registration should succeed");

    let allow = vec!["generator".to_string()];
    let set = registry.load(Some(&allow), false).expect("load should succeed");

    assert_eq!(names(&set), vec!["generator"]);
}

///
/// DISCOVERY
///

#[test]
fn slow_probe_beats_adapter_that_never_claims() {
    let never = scripted("never", Support::No, Support::No);
    let hesitant = scripted("hesitant", Support::Maybe, Support::Yes);
    let set = AdapterSet::from_factories([never.clone() as Arc<dyn AdapterFactory>, hesitant.clone()]);

    let (binding, slow) = find_adapter("data.bin", &set, &BTreeMap::new()).expect("hesitant adapter should win");

    assert_eq!(binding.adapter, "hesitant");
    assert!(slow, "the slow pass should have decided");
    assert_eq!(never.probes(), 1, "adapters answering No are not asked twice");
    assert_eq!(hesitant.probes(), 2);
}

#[test]
fn fast_yes_wins_before_any_slow_probe() {
    let hesitant = scripted("hesitant", Support::Maybe, Support::Yes);
    let eager = scripted("eager", Support::Yes, Support::Yes);
    let set = AdapterSet::from_factories([hesitant.clone() as Arc<dyn AdapterFactory>, eager]);

    let (binding, slow) = find_adapter("x", &set, &BTreeMap::new()).expect("eager adapter should win");

    assert_eq!(binding.adapter, "eager");
    assert!(!slow);
    assert_eq!(hesitant.probes(), 1, "no slow probe once a fast Yes exists");
}

#[test]
fn registration_order_breaks_ties() {
    let set = AdapterSet::from_factories([
        scripted("first", Support::Yes, Support::Yes) as Arc<dyn AdapterFactory>,
        scripted("second", Support::Yes, Support::Yes),
    ]);

    let (binding, _) = find_adapter("x", &set, &BTreeMap::new()).expect("resolution should succeed");
    assert_eq!(binding.adapter, "first");
}

#[test]
fn unclaimed_identifier_reports_no_adapter() {
    let set = AdapterSet::from_factories([
        scripted("never", Support::No, Support::No) as Arc<dyn AdapterFactory>,
        scripted("hesitant", Support::Maybe, Support::No),
    ]);

    let err = find_adapter("x", &set, &BTreeMap::new()).expect_err("nothing should claim x");
    assert_eq!(err.class, ErrorClass::NoAdapterFound);
}

#[test]
fn binding_carries_adapter_config() {
    let set = AdapterSet::from_factories([scripted("memory", Support::Yes, Support::Yes) as Arc<dyn AdapterFactory>]);
    let mut config = AdapterConfig::new();
    config.insert("rows".to_string(), ArgValue::Integer(10));
    let configs = BTreeMap::from([("memory".to_string(), config.clone())]);

    let (binding, _) = find_adapter("x", &set, &configs).expect("resolution should succeed");
    assert_eq!(binding.config, config);
}

#[test]
fn resolution_is_memoized_per_identifier() {
    let hesitant = scripted("hesitant", Support::Maybe, Support::Yes);
    let set = AdapterSet::from_factories([hesitant.clone() as Arc<dyn AdapterFactory>]);
    let mut discovery = Discovery::new();

    assert_eq!(discovery.state("t"), ProbeState::Unresolved);
    discovery
        .resolve("t", &set, &BTreeMap::new())
        .expect("first resolution should succeed");
    let probes = hesitant.probes();
    discovery
        .resolve("t", &set, &BTreeMap::new())
        .expect("second resolution should succeed");

    assert_eq!(hesitant.probes(), probes, "a resolved identifier is never re-probed");
    assert_eq!(discovery.state("t"), ProbeState::Resolved);
}

#[test]
fn failed_resolution_is_retried() {
    let never = scripted("never", Support::No, Support::No);
    let set = AdapterSet::from_factories([never.clone() as Arc<dyn AdapterFactory>]);
    let mut discovery = Discovery::new();

    for _ in 0..2 {
        discovery
            .resolve("t", &set, &BTreeMap::new())
            .expect_err("resolution should fail");
    }

    assert_eq!(never.probes(), 2, "failures are not memoized");
    assert_eq!(discovery.state("t"), ProbeState::Unresolved);
}
