// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `MockStore` for testing: record operations, inject failures, inspect promotions.

use multilevel::{MockStore, Payload, StoreOp, Tier, TieredCache};

fn main() {
    let l1 = MockStore::<i32>::new();
    let l2 = MockStore::<i32>::serialized();
    l2.seed("answer", Payload::Serialized(b"42".to_vec()), &[]);

    let cache = TieredCache::new("numbers");
    cache
        .set_tiers(vec![Tier::new(l1.clone()), Tier::new(l2.clone())])
        .expect("tiers should install");

    // A hit in the second tier is promoted into the first
    let value = cache.get("answer").expect("get failed");
    println!("get: {value:?}, promoted: {}", l1.contains_key("answer"));
    println!("operations on l1: {:?}", l1.operations());

    // Inject failures for testing error paths
    l2.fail_when(|op| matches!(op, StoreOp::Set { .. }));
    match cache.set("other", &7, &[], None) {
        Ok(()) => println!("after fail_when: unexpected success"),
        Err(e) => println!("after fail_when: {} tier(s) failed: {e}", e.tier_failures().len()),
    }

    // The first tier was still written
    println!("l1 holds 'other': {}", l1.contains_key("other"));

    l2.clear_failures();
    cache.set("other", &7, &[], None).expect("set failed");
    println!("after clear_failures: {:?}", l2.payload("other"));
}
