// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for configuration, reconfiguration and frontend binding.

use std::thread;

use multilevel::{Error, Frontend, Payload, StoreRegistry, Tier, TierConfig, TieredCache};
use multilevel_store::testing::{MockStore, StoreOp};
use serde_json::json;

type TestResult = Result<(), Error>;

fn registry_of(stores: &[(&str, MockStore<String>)]) -> StoreRegistry<String> {
    stores.iter().fold(StoreRegistry::new(), |registry, (kind, store)| {
        let store = store.clone();
        registry.with_store(*kind, move |_| Ok(store.clone()))
    })
}

fn tier_configs(value: serde_json::Value) -> Vec<TierConfig> {
    serde_json::from_value(value).expect("tier configs should parse")
}

#[test]
fn every_operation_fails_before_configuration() {
    let cache = TieredCache::<String>::new("pages");

    assert!(!cache.is_configured());
    assert_eq!(cache.tier_count(), 0);
    assert!(cache.get("k").expect_err("get").is_not_configured());
    assert!(cache.set("k", &"v".to_string(), &[], None).expect_err("set").is_not_configured());
    assert!(cache.has("k").expect_err("has").is_not_configured());
    assert!(cache.remove("k").expect_err("remove").is_not_configured());
    assert!(cache.flush().expect_err("flush").is_not_configured());
    assert!(cache.flush_by_tag("t").expect_err("flush_by_tag").is_not_configured());
    assert!(cache.find_identifiers_by_tag("t").expect_err("find").is_not_configured());
    assert!(cache.collect_garbage().expect_err("collect_garbage").is_not_configured());
    assert!(cache.table_definitions().expect_err("table_definitions").is_not_configured());
}

#[test]
fn configure_resolves_kinds_and_policies() -> TestResult {
    let fast = MockStore::<String>::new();
    let durable = MockStore::<String>::serialized();
    let cache = TieredCache::with_registry("pages", registry_of(&[("fast", fast.clone()), ("durable", durable.clone())]));

    cache.configure(&tier_configs(json!([
        { "store": "fast", "policy": { "prefix": "pages_", "flush": false } },
        { "store": "durable" }
    ])))?;
    assert!(cache.is_configured());
    assert_eq!(cache.tier_count(), 2);

    cache.set("home", &"<html>".to_string(), &["layout"], None)?;
    assert_eq!(fast.keys(), vec!["pages_home"]);
    assert_eq!(durable.keys(), vec!["home"]);

    cache.flush()?;
    assert!(fast.contains_key("pages_home"));
    assert!(!durable.contains_key("home"));
    Ok(())
}

#[test]
fn configure_uses_registry_default_kind() -> TestResult {
    let store = MockStore::<String>::serialized();
    let registry = registry_of(&[("database", store.clone())]).with_default_kind("database");
    let cache = TieredCache::with_registry("pages", registry);

    cache.configure(&tier_configs(json!([{ "options": { "table": "cache_pages" } }])))?;
    cache.set("k", &"v".to_string(), &[], None)?;

    assert!(store.contains_key("k"));
    Ok(())
}

#[test]
fn unknown_kind_leaves_previous_tiers_in_place() -> TestResult {
    let store = MockStore::<String>::new();
    let cache = TieredCache::with_registry("pages", registry_of(&[("mock", store.clone())]));
    cache.configure(&[TierConfig::new("mock")])?;
    cache.set("k", &"v".to_string(), &[], None)?;

    let error = cache
        .configure(&[TierConfig::new("mock"), TierConfig::new("redis")])
        .expect_err("unknown kind should fail");

    assert!(error.is_configuration());
    assert!(error.to_string().contains("redis"), "got: {error}");
    assert_eq!(cache.tier_count(), 1);
    assert_eq!(cache.get("k")?, Some("v".to_string()));
    Ok(())
}

#[test]
fn failed_first_configuration_stays_unconfigured() {
    let cache = TieredCache::<String>::with_registry("pages", StoreRegistry::new());

    assert!(cache.configure(&[TierConfig::new("redis")]).expect_err("should fail").is_configuration());
    assert!(!cache.is_configured());
    assert!(cache.get("k").expect_err("still unconfigured").is_not_configured());
}

#[test]
fn stores_are_initialized_once_before_use() -> TestResult {
    let a = MockStore::<String>::new();
    let b = MockStore::<String>::serialized();
    let cache = TieredCache::new("pages");

    cache.set_tiers(vec![Tier::new(a.clone()), Tier::new(b.clone())])?;
    cache.get("k")?;

    assert_eq!(a.operations()[0], StoreOp::Initialize);
    assert_eq!(a.count(|op| *op == StoreOp::Initialize), 1);
    assert_eq!(b.count(|op| *op == StoreOp::Initialize), 1);
    Ok(())
}

#[test]
fn initialization_failure_is_a_configuration_error() -> TestResult {
    let good = MockStore::<String>::new();
    let bad = MockStore::<String>::new();
    bad.fail_when(|op| *op == StoreOp::Initialize);
    let cache = TieredCache::new("pages");
    cache.set_tiers(vec![Tier::new(good.clone())])?;

    let error = cache
        .set_tiers(vec![Tier::new(MockStore::new()), Tier::new(bad)])
        .expect_err("initialize should fail");

    assert!(error.is_configuration());
    assert!(error.to_string().contains("tier 1"), "got: {error}");
    cache.set("k", &"v".to_string(), &[], None)?;
    assert!(good.contains_key("k"), "previous tiers stay active");
    Ok(())
}

#[test]
fn frontend_reaches_current_and_future_tiers() -> TestResult {
    let first = MockStore::<String>::new();
    let second = MockStore::<String>::new();
    let cache = TieredCache::new("pages");

    cache.bind_frontend(Frontend::new("pages-frontend"));
    cache.set_tiers(vec![Tier::new(first.clone())])?;
    assert_eq!(first.frontend(), Some(Frontend::new("pages-frontend")));

    cache.bind_frontend(Frontend::new("rebound"));
    assert_eq!(first.frontend(), Some(Frontend::new("rebound")));

    cache.set_tiers(vec![Tier::new(second.clone())])?;
    assert_eq!(second.frontend(), Some(Frontend::new("rebound")));
    assert_eq!(cache.frontend(), Some(Frontend::new("rebound")));
    Ok(())
}

#[test]
fn table_definitions_concatenate_schemas_in_tier_order() -> TestResult {
    let cache = TieredCache::<String>::new("pages");
    cache.set_tiers(vec![
        Tier::new(MockStore::new().with_schema("CREATE TABLE cache_pages (id int);")),
        Tier::new(MockStore::new()),
        Tier::new(MockStore::serialized().with_schema("CREATE TABLE cache_pages_tags (tag text);")),
    ])?;

    assert_eq!(
        cache.table_definitions()?,
        "\nCREATE TABLE cache_pages (id int);\nCREATE TABLE cache_pages_tags (tag text);"
    );
    Ok(())
}

#[test]
fn table_definitions_are_empty_without_schemas() -> TestResult {
    let cache = TieredCache::<String>::new("pages");
    cache.set_tiers(vec![Tier::new(MockStore::new())])?;

    assert_eq!(cache.table_definitions()?, "");
    Ok(())
}

#[test]
fn empty_tier_list_is_a_configured_cache_that_holds_nothing() -> TestResult {
    let cache = TieredCache::<String>::new("pages");
    cache.set_tiers(Vec::new())?;

    assert!(cache.is_configured());
    cache.set("k", &"v".to_string(), &[], None)?;
    assert_eq!(cache.get("k")?, None);
    assert!(cache.find_identifiers_by_tag("t")?.is_empty());
    Ok(())
}

#[test]
fn concurrent_readers_see_a_whole_tier_list() {
    let old = [MockStore::<String>::new(), MockStore::<String>::new()];
    let new = [MockStore::<String>::new(), MockStore::<String>::new()];
    for store in &old {
        store.seed("k", Payload::Native("old".to_string()), &[]);
    }
    for store in &new {
        store.seed("k", Payload::Native("new".to_string()), &[]);
    }

    let cache = TieredCache::new("pages");
    cache
        .set_tiers(old.iter().cloned().map(Tier::new).collect())
        .expect("tiers should install");

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let value = cache.get("k").expect("get should not fail");
                    assert!(matches!(value.as_deref(), Some("old" | "new")), "got {value:?}");
                    assert_eq!(cache.tier_count(), 2);
                }
            });
        }

        for round in 0..50 {
            let stores = if round % 2 == 0 { &new } else { &old };
            cache
                .set_tiers(stores.iter().cloned().map(Tier::new).collect())
                .expect("tiers should install");
        }
    });
}
