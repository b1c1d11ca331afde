// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Multilevel caching: one logical cache over an ordered list of stores.
//!
//! This crate composes independently configured stores ("tiers") into a single
//! [`TieredCache`]. The usual layout puts a fast, volatile tier in front of a slower,
//! durable one:
//! - Reads are served by the fastest tier holding the key, and values found deeper
//!   are promoted into the faster tiers
//! - Writes and removals cascade to every tier whose policy accepts them
//! - Tag invalidation uses each tier's tag index, falling back to a full flush for
//!   tiers without one
//! - Per-tier key prefixes let several logical caches share one store
//!
//! Tiers are built from serializable [`TierConfig`]s through a [`StoreRegistry`], or
//! handed over ready-made as [`Tier`]s. [`CacheDefinitions::layer`] turns a host's
//! named cache definitions into a tier list.
//!
//! # Examples
//!
//! ## Configuring From Store Kinds
//!
//! ```
//! use multilevel::{StoreOptions, TierConfig, TieredCache};
//!
//! let cache = TieredCache::<String>::new("pages");
//! cache.configure(&[
//!     TierConfig::new("memory").with_options(StoreOptions::new().with("max_capacity", 100)),
//!     TierConfig::new("memory"),
//! ])?;
//!
//! cache.set("home", &"<html>".to_string(), &["layout"], None)?;
//! assert!(cache.has("home")?);
//! assert_eq!(cache.find_identifiers_by_tag("layout")?.len(), 1);
//! # Ok::<(), multilevel::Error>(())
//! ```
//!
//! ## Custom Stores
//!
//! Any [`CacheStore`] can be registered under a kind of its own:
//!
//! ```
//! use multilevel::{StoreRegistry, TierConfig, TieredCache};
//! use multilevel_memory::InMemoryStore;
//!
//! let registry = StoreRegistry::<u64>::with_defaults()
//!     .with_store("small", |_options| Ok(InMemoryStore::<u64>::with_capacity(8)));
//!
//! let cache = TieredCache::with_registry("counters", registry);
//! cache.configure(&[TierConfig::new("small"), TierConfig::new("memory")])?;
//! assert_eq!(cache.tier_count(), 2);
//! # Ok::<(), multilevel::Error>(())
//! ```
//!
//! # Features
//!
//! - `memory` (default): registers [`multilevel_memory::InMemoryStore`] as the `memory` kind
//! - `logs` (default): emits `tracing` events for hits, misses, promotions and failures
//! - `test-util`: re-exports the recording [`MockStore`] test double

use serde::Serialize;
use serde::de::DeserializeOwned;

mod cache;
mod codec;
mod config;
mod error;
mod layered;
mod registry;
mod telemetry;
mod tier;

#[doc(inline)]
pub use cache::TieredCache;
#[doc(inline)]
pub use config::{StoreOptions, TierConfig, TierPolicyConfig};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result, TierFailure};
#[doc(inline)]
pub use layered::{CacheDefinition, CacheDefinitions, LayeredConfiguration, MULTILEVEL_STORE_KIND, TierReference};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use multilevel_memory::InMemoryStore;
#[doc(inline)]
pub use multilevel_store::{CacheStore, Capabilities, Frontend, Payload};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use multilevel_store::testing::{MockStore, StoreOp};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use registry::MEMORY_STORE_KIND;
#[doc(inline)]
pub use registry::StoreRegistry;
#[doc(inline)]
pub use tier::{Tier, TierPolicy};

/// Values a [`TieredCache`] can hold.
///
/// Volatile tiers keep clones of the value; other tiers receive it as JSON.
pub trait CacheValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
