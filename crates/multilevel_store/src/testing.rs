// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, a configurable in-memory store that
//! records all operations and supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{CacheStore, Capabilities, Error, Frontend, Payload};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A get was performed with the given key.
    Get(String),
    /// A set was performed.
    Set {
        /// The key that was written.
        key: String,
        /// Whether the payload arrived in native form.
        native: bool,
        /// The tags attached to the entry.
        tags: Vec<String>,
        /// The lifetime requested for the entry.
        ttl: Option<Duration>,
    },
    /// A presence check was performed with the given key.
    Has(String),
    /// A removal was performed with the given key.
    Remove(String),
    /// A full flush was performed.
    Flush,
    /// A tag flush was performed with the given tag.
    FlushByTag(String),
    /// A tag lookup was performed with the given tag.
    FindIdentifiersByTag(String),
    /// Garbage collection was requested.
    CollectGarbage,
    /// Post-construction setup was run.
    Initialize,
}

impl StoreOp {
    /// Returns `true` for operations that write or delete a single key.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::Remove(_))
    }

    /// Returns `true` for operations that flush in bulk.
    #[must_use]
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush | Self::FlushByTag(_))
    }
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct StoredEntry<V> {
    payload: Payload<V>,
    tags: Vec<String>,
}

/// A configurable mock store for testing.
///
/// The store keeps entries in memory, records every operation and can be told to
/// fail operations on demand. Clones share state, so a test can hand one clone to
/// the engine and inspect another.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use multilevel_store::testing::{MockStore, StoreOp};
/// use multilevel_store::{CacheStore, Payload};
///
/// let store = MockStore::<i32>::new();
/// store.set("key", Payload::Native(42), &[], None).unwrap();
/// assert_eq!(store.get("key").unwrap(), Some(Payload::Native(42)));
///
/// assert_eq!(store.count(|op| matches!(op, StoreOp::Get(_))), 1);
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
///
/// # Failure Injection
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use multilevel_store::testing::{MockStore, StoreOp};
/// use multilevel_store::CacheStore;
///
/// let store = MockStore::<i32>::new();
/// store.fail_when(|op| matches!(op, StoreOp::Get(k) if k == "forbidden"));
/// assert!(store.get("forbidden").is_err());
/// assert!(store.get("allowed").is_ok());
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
pub struct MockStore<V> {
    capabilities: Capabilities,
    schema: Option<String>,
    data: Arc<Mutex<HashMap<String, StoredEntry<V>>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    frontend: Arc<Mutex<Option<Frontend>>>,
}

impl<V> std::fmt::Debug for MockStore<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("capabilities", &self.capabilities)
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MockStore<V> {
    fn clone(&self) -> Self {
        Self {
            capabilities: self.capabilities,
            schema: self.schema.clone(),
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            frontend: Arc::clone(&self.frontend),
        }
    }
}

impl<V> Default for MockStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockStore<V> {
    /// Creates an empty volatile store with tag support.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::volatile().with_tags())
    }

    /// Creates an empty store that exchanges serialized payloads and supports tags.
    #[must_use]
    pub fn serialized() -> Self {
        Self::with_capabilities(Capabilities::serialized().with_tags())
    }

    /// Creates an empty store advertising the given capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            schema: None,
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            frontend: Arc::new(Mutex::new(None)),
        }
    }

    /// Disables tag support.
    #[must_use]
    pub fn without_tags(mut self) -> Self {
        self.capabilities.taggable = false;
        self
    }

    /// Declares a persistent-storage schema for this store.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Stores a payload directly, bypassing operation recording and failure injection.
    pub fn seed(&self, key: impl Into<String>, payload: Payload<V>, tags: &[&str]) {
        self.data.lock().insert(
            key.into(),
            StoredEntry {
                payload,
                tags: tags.iter().map(ToString::to_string).collect(),
            },
        );
    }

    /// Returns the number of entries in the store.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the store contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns a sorted list of all stored keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the frontend most recently bound to this store.
    #[must_use]
    pub fn frontend(&self) -> Option<Frontend> {
        self.frontend.lock().clone()
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should fail.
    /// Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Returns how many recorded operations match the predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&StoreOp) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn check(&self, op: StoreOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let message = format!("mock: {op:?} failed");
        self.operations.lock().push(op);
        if fail { Err(Error::from_message(message)) } else { Ok(()) }
    }
}

impl<V> MockStore<V>
where
    V: Clone,
{
    /// Returns the payload stored under `key` without recording an operation.
    #[must_use]
    pub fn payload(&self, key: &str) -> Option<Payload<V>> {
        self.data.lock().get(key).map(|entry| entry.payload.clone())
    }

    /// Returns the tags stored with `key` without recording an operation.
    #[must_use]
    pub fn tags(&self, key: &str) -> Option<Vec<String>> {
        self.data.lock().get(key).map(|entry| entry.tags.clone())
    }
}

impl<V> CacheStore<V> for MockStore<V>
where
    V: Clone + Send + Sync,
{
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn get(&self, key: &str) -> Result<Option<Payload<V>>, Error> {
        self.check(StoreOp::Get(key.to_string()))?;
        Ok(self.payload(key))
    }

    fn set(&self, key: &str, payload: Payload<V>, tags: &[&str], ttl: Option<Duration>) -> Result<(), Error> {
        self.check(StoreOp::Set {
            key: key.to_string(),
            native: payload.is_native(),
            tags: tags.iter().map(ToString::to_string).collect(),
            ttl,
        })?;
        self.seed(key, payload, tags);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, Error> {
        self.check(StoreOp::Has(key.to_string()))?;
        Ok(self.contains_key(key))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.check(StoreOp::Remove(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.check(StoreOp::Flush)?;
        self.data.lock().clear();
        Ok(())
    }

    fn collect_garbage(&self) -> Result<(), Error> {
        self.check(StoreOp::CollectGarbage)
    }

    fn flush_by_tag(&self, tag: &str) -> Result<(), Error> {
        if !self.capabilities.taggable {
            return Err(Error::unsupported("flush_by_tag"));
        }
        self.check(StoreOp::FlushByTag(tag.to_string()))?;
        self.data.lock().retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        Ok(())
    }

    fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, Error> {
        if !self.capabilities.taggable {
            return Err(Error::unsupported("find_identifiers_by_tag"));
        }
        self.check(StoreOp::FindIdentifiersByTag(tag.to_string()))?;
        let mut identifiers: Vec<String> = self
            .data
            .lock()
            .iter()
            .filter(|(_, entry)| entry.tags.iter().any(|t| t == tag))
            .map(|(key, _)| key.clone())
            .collect();
        identifiers.sort();
        Ok(identifiers)
    }

    fn initialize(&self) -> Result<(), Error> {
        self.check(StoreOp::Initialize)
    }

    fn bind_frontend(&self, frontend: &Frontend) {
        *self.frontend.lock() = Some(frontend.clone());
    }

    fn schema(&self) -> Option<String> {
        self.schema.clone()
    }
}
