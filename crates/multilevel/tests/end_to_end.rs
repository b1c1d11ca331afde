// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! End-to-end tests over real in-memory stores.

#![cfg(feature = "memory")]

use std::collections::BTreeSet;

use multilevel::{
    CacheDefinitions, Error, Frontend, InMemoryStore, LayeredConfiguration, Payload, StoreRegistry, Tier, TierPolicy,
    TieredCache,
};
use multilevel_store::CacheStore;
use multilevel_store::testing::MockStore;
use serde::{Deserialize, Serialize};
use serde_json::json;

type TestResult = Result<(), Error>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Page {
    title: String,
    views: u32,
}

fn page(title: &str) -> Page {
    Page {
        title: title.to_string(),
        views: 7,
    }
}

#[test]
fn memory_in_front_of_durable_store() -> TestResult {
    let memory = InMemoryStore::<Page>::new();
    let durable = MockStore::<Page>::serialized();
    let cache = TieredCache::new("pages");
    cache.set_tiers(vec![Tier::new(memory.clone()), Tier::new(durable.clone())])?;

    cache.set("home", &page("Home"), &["layout"], None)?;
    assert!(memory.has("home").expect("memory lookup"));
    assert!(matches!(durable.payload("home"), Some(Payload::Serialized(_))));

    cache.flush_by_tag("layout")?;
    assert_eq!(cache.get("home")?, None);
    assert!(!durable.contains_key("home"));
    Ok(())
}

#[test]
fn durable_hit_refills_memory() -> TestResult {
    let memory = InMemoryStore::<Page>::new();
    let durable = MockStore::<Page>::serialized();
    let bytes = serde_json::to_vec(&page("About")).expect("page should serialize");
    durable.seed("about", Payload::Serialized(bytes), &["layout"]);

    let cache = TieredCache::new("pages");
    cache.set_tiers(vec![Tier::new(memory.clone()), Tier::new(durable)])?;

    assert_eq!(cache.get("about")?, Some(page("About")));
    assert_eq!(memory.len(), 1);
    assert!(cache.has("about")?);
    Ok(())
}

#[test]
fn shared_store_with_prefixes_keeps_caches_apart() -> TestResult {
    let shared = InMemoryStore::<String>::new();
    let tier = |prefix: &str| Tier::new(shared.clone()).with_policy(TierPolicy::new().prefix(prefix));

    let pages = TieredCache::new("pages");
    pages.set_tiers(vec![tier("pages")])?;
    let menus = TieredCache::new("menus");
    menus.set_tiers(vec![tier("menus")])?;

    pages.set("home", &"page".to_string(), &["navigation"], None)?;
    menus.set("home", &"menu".to_string(), &["navigation"], None)?;

    assert_eq!(pages.get("home")?, Some("page".to_string()));
    assert_eq!(menus.get("home")?, Some("menu".to_string()));
    assert_eq!(pages.find_identifiers_by_tag("navigation")?, BTreeSet::from(["home".to_string()]));

    pages.remove("home")?;
    assert_eq!(menus.get("home")?, Some("menu".to_string()));
    Ok(())
}

#[test]
fn layered_definitions_drive_configuration() -> TestResult {
    let shared = InMemoryStore::<String>::new();
    let durable = MockStore::<String>::serialized();
    let registry = {
        let shared = shared.clone();
        let durable = durable.clone();
        StoreRegistry::<String>::with_defaults()
            .with_store("shared-memory", move |_| Ok(shared.clone()))
            .with_store("database", move |_| Ok(durable.clone()))
    };

    let mut definitions: CacheDefinitions = serde_json::from_value(json!({
        "pages": { "frontend": "variable", "backend": "database", "options": { "table": "cache_pages" } },
        "runtime": { "store": "shared-memory", "policy": { "force_prefix_to_target_name": true, "flush": false } }
    }))
    .expect("definitions should parse");

    let layered = definitions.layer("pages", ["runtime".into(), "pages".into()])?;
    definitions.apply_layered(&layered)?;

    let stored = definitions.get("pages").expect("pages should stay defined");
    assert!(stored.is_layered());
    let reloaded = LayeredConfiguration::from_definition("pages", stored)?;
    assert_eq!(reloaded, layered);

    let cache = TieredCache::with_registry("pages", registry);
    cache.configure(&reloaded.tiers)?;
    cache.bind_frontend(Frontend::new("variable"));

    cache.set("home", &"<html>".to_string(), &["layout"], None)?;
    assert_eq!(durable.keys(), vec!["home"]);
    assert!(shared.has("pageshome").expect("shared lookup"));

    cache.flush()?;
    assert!(!durable.contains_key("home"));
    assert_eq!(cache.get("home")?, Some("<html>".to_string()), "runtime tier skips flushes");
    Ok(())
}

#[test]
fn expired_entries_are_collected() -> TestResult {
    let memory = InMemoryStore::<String>::builder().time_to_live(std::time::Duration::from_millis(1)).build();
    let cache = TieredCache::new("pages");
    cache.set_tiers(vec![Tier::new(memory.clone())])?;

    cache.set("k", &"v".to_string(), &[], None)?;
    std::thread::sleep(std::time::Duration::from_millis(20));
    cache.collect_garbage()?;

    assert_eq!(cache.get("k")?, None);
    assert!(memory.is_empty());
    Ok(())
}
