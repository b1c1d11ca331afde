// Copyright (c) Microsoft Corporation.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory store for multilevel caches, backed by moka.
//!
//! This crate provides [`InMemoryStore`], a concurrent, volatile store using moka's
//! `TinyLFU` eviction algorithm. Values are kept in native form, so the multilevel
//! engine never serializes what it writes here. Entries can carry tags and be
//! invalidated by tag. Use [`InMemoryStoreBuilder`] to configure capacity, TTL and
//! TTI without exposing moka types directly.
//!
//! # Quick Start
//!
//! ```
//! use multilevel_memory::InMemoryStoreBuilder;
//! use multilevel_store::{CacheStore, Payload};
//! use std::time::Duration;
//!
//! let store = InMemoryStoreBuilder::<i32>::new()
//!     .max_capacity(1000)
//!     .time_to_live(Duration::from_secs(300))
//!     .build();
//!
//! store.set("key", Payload::Native(42), &["numbers"], None)?;
//! assert_eq!(store.get("key")?, Some(Payload::Native(42)));
//! assert_eq!(store.find_identifiers_by_tag("numbers")?, vec!["key".to_string()]);
//! # Ok::<(), multilevel_store::Error>(())
//! ```
//!
//! # Features
//!
//! - **Capacity limits**: Set maximum entry count with automatic eviction
//! - **TTL/TTI**: Store-wide time-to-live and time-to-idle, plus per-entry lifetimes
//! - **Tags**: `flush_by_tag` and `find_identifiers_by_tag` are supported
//! - **Thread-safe**: Safe for concurrent access from multiple threads

pub mod builder;
pub mod store;

#[doc(inline)]
pub use builder::InMemoryStoreBuilder;
#[doc(inline)]
pub use store::InMemoryStore;
