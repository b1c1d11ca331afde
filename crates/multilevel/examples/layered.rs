// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Layers a shared in-memory tier in front of a cache's own store.
//!
//! The `runtime` definition describes a store shared by many caches. Its policy
//! asks for the target's name as key prefix, so the `pages` and `menus` caches
//! can both be layered over it without their keys colliding.

use multilevel::{
    CacheDefinition, CacheDefinitions, Frontend, InMemoryStore, StoreRegistry, TierConfig, TierPolicyConfig, TieredCache,
};

fn main() -> Result<(), multilevel::Error> {
    // Every tier of kind "shared-memory" is a handle to the same store.
    let shared = InMemoryStore::<String>::new();
    let registry = StoreRegistry::<String>::with_defaults().with_store("shared-memory", move |_| Ok(shared.clone()));

    let mut definitions = CacheDefinitions::new();
    definitions.insert("pages", CacheDefinition::new(TierConfig::new("memory")).with_frontend("variable"));
    definitions.insert("menus", CacheDefinition::new(TierConfig::new("memory")).with_frontend("variable"));
    definitions.insert(
        "runtime",
        CacheDefinition::new(TierConfig::new("shared-memory").with_policy(TierPolicyConfig {
            force_prefix_to_target_name: true,
            ..TierPolicyConfig::default()
        })),
    );

    for target in ["pages", "menus"] {
        let layered = definitions.layer(target, ["runtime".into(), target.into()])?;
        definitions.apply_layered(&layered)?;

        let cache = TieredCache::with_registry(target, registry.clone());
        cache.configure(&layered.tiers)?;
        cache.bind_frontend(Frontend::new(target));

        cache.set("home", &format!("{target} for home"), &["navigation"], None)?;
        println!("{target}: {:?}", cache.get("home")?);
        println!("{target}: tagged {:?}", cache.find_identifiers_by_tag("navigation")?);
    }

    match serde_json::to_string_pretty(&definitions) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("cannot print definitions: {e}"),
    }

    Ok(())
}
