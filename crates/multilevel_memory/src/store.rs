// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory store implementation using moka.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use multilevel_store::{CacheStore, Capabilities, Error, Payload};
use parking_lot::Mutex;

use crate::builder::InMemoryStoreBuilder;

#[derive(Clone, Debug)]
struct MemoryEntry<V> {
    value: V,
    tags: Arc<[String]>,
    ttl: Option<Duration>,
}

impl<V> MemoryEntry<V> {
    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Applies the lifetime requested for a single entry.
struct EntryLifetime;

impl<V> Expiry<String, MemoryEntry<V>> for EntryLifetime {
    fn expire_after_create(&self, _key: &String, value: &MemoryEntry<V>, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Maps a tag to the keys written with it.
///
/// The index may name keys that have since been evicted, expired or rewritten
/// without the tag. Readers confirm against the cache before acting on it.
type TagIndex = HashMap<String, HashSet<String>>;

/// A volatile, tag-aware store backed by moka.
///
/// Values are kept in native form and exchanged as [`Payload::Native`]. Clones share
/// the underlying cache.
///
/// # Examples
///
/// ```
/// use multilevel_memory::InMemoryStore;
/// use multilevel_store::{CacheStore, Payload};
///
/// let store = InMemoryStore::<String>::new();
/// store.set("greeting", Payload::Native("hello".to_string()), &["text"], None)?;
/// assert!(store.has("greeting")?);
///
/// store.flush_by_tag("text")?;
/// assert!(!store.has("greeting")?);
/// # Ok::<(), multilevel_store::Error>(())
/// ```
#[derive(Clone)]
pub struct InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, MemoryEntry<V>>,
    tags: Arc<Mutex<TagIndex>>,
}

impl<V> std::fmt::Debug for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entry_count", &self.entries.entry_count())
            .field("tag_count", &self.tags.lock().len())
            .finish()
    }
}

impl<V> Default for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a store holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder for configuring a store.
    #[must_use]
    pub fn builder() -> InMemoryStoreBuilder<V> {
        InMemoryStoreBuilder::new()
    }

    pub(crate) fn from_builder(builder: &InMemoryStoreBuilder<V>) -> Self {
        let mut moka_builder = Cache::<String, MemoryEntry<V>>::builder().expire_after(EntryLifetime);

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            entries: moka_builder.build(),
            tags: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the number of live entries after applying pending evictions.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Returns `true` if the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn index(index: &mut TagIndex, key: &str, tags: &[String]) {
        for tag in tags {
            index.entry(tag.clone()).or_default().insert(key.to_string());
        }
    }

    /// Removes the tag's key set and returns the keys that still carry the tag.
    fn take_tagged(&self, tag: &str) -> Vec<String> {
        let candidates = self.tags.lock().remove(tag).unwrap_or_default();
        candidates
            .into_iter()
            .filter(|key| self.entries.get(key).is_some_and(|entry| entry.has_tag(tag)))
            .collect()
    }

    fn prune_index(&self) {
        let mut index = self.tags.lock();
        index.retain(|tag, keys| {
            keys.retain(|key| self.entries.get(key).is_some_and(|entry| entry.has_tag(tag)));
            !keys.is_empty()
        });
    }
}

impl<V> CacheStore<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::volatile().with_tags()
    }

    fn get(&self, key: &str) -> Result<Option<Payload<V>>, Error> {
        Ok(self.entries.get(key).map(|entry| Payload::Native(entry.value)))
    }

    fn set(&self, key: &str, payload: Payload<V>, tags: &[&str], ttl: Option<Duration>) -> Result<(), Error> {
        let Payload::Native(value) = payload else {
            return Err(Error::from_message("in-memory store only accepts native payloads"));
        };
        let tags: Arc<[String]> = tags.iter().map(ToString::to_string).collect();

        // Index and entry are written under the tag lock so `flush` sees both or neither.
        let mut index = self.tags.lock();
        Self::index(&mut index, key, &tags);
        self.entries.insert(key.to_string(), MemoryEntry { value, tags, ttl });
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.contains_key(key))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.invalidate(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut index = self.tags.lock();
        self.entries.invalidate_all();
        index.clear();
        Ok(())
    }

    fn collect_garbage(&self) -> Result<(), Error> {
        self.entries.run_pending_tasks();
        self.prune_index();
        Ok(())
    }

    fn flush_by_tag(&self, tag: &str) -> Result<(), Error> {
        for key in self.take_tagged(tag) {
            self.entries.invalidate(&key);
        }
        Ok(())
    }

    fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, Error> {
        let candidates: Vec<String> = self
            .tags
            .lock()
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        let mut identifiers: Vec<String> = candidates
            .into_iter()
            .filter(|key| self.entries.get(key).is_some_and(|entry| entry.has_tag(tag)))
            .collect();
        identifiers.sort();
        Ok(identifiers)
    }
}
