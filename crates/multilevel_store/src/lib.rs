// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Capability contract for stores participating in a multilevel cache.
//!
//! This crate defines the [`CacheStore`] trait that every tier of a multilevel cache
//! must satisfy, the [`Payload`] type a tier hands values back in, the [`Capabilities`]
//! a tier advertises once when it is configured, and the [`Error`] type for fallible
//! store operations.
//!
//! # Overview
//!
//! A store only has to implement plain key/value operations. Tag-indexed invalidation,
//! post-construction setup, frontend binding and schema declaration are optional and
//! come with default implementations. The `multilevel` crate composes any number of
//! stores into one logical cache.
//!
//! # Implementing a Store
//!
//! ```
//! use multilevel_store::{CacheStore, Capabilities, Error, Payload};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//! use std::time::Duration;
//!
//! struct SimpleStore<V>(RwLock<HashMap<String, V>>);
//!
//! impl<V: Clone + Send + Sync> CacheStore<V> for SimpleStore<V> {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::volatile()
//!     }
//!
//!     fn get(&self, key: &str) -> Result<Option<Payload<V>>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned().map(Payload::Native))
//!     }
//!
//!     fn set(&self, key: &str, payload: Payload<V>, _tags: &[&str], _ttl: Option<Duration>) -> Result<(), Error> {
//!         let value = payload.into_native().ok_or_else(|| Error::from_message("expected a native value"))?;
//!         self.0.write().unwrap().insert(key.to_string(), value);
//!         Ok(())
//!     }
//!
//!     fn has(&self, key: &str) -> Result<bool, Error> {
//!         Ok(self.0.read().unwrap().contains_key(key))
//!     }
//!
//!     fn remove(&self, key: &str) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     fn flush(&self) -> Result<(), Error> {
//!         self.0.write().unwrap().clear();
//!         Ok(())
//!     }
//!
//!     fn collect_garbage(&self) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
mod frontend;
mod payload;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use frontend::Frontend;
#[doc(inline)]
pub use payload::Payload;
#[doc(inline)]
pub use store::{CacheStore, Capabilities};
