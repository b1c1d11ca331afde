// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for stores composed into a multilevel cache.
//!
//! [`CacheStore`] defines the interface every tier must implement. The required
//! methods cover plain key/value storage; optional capabilities have default
//! implementations that either do nothing or report [`Error::unsupported`].

use std::time::Duration;

use crate::{Error, Frontend, Payload};

/// Capabilities a store advertises to the engine.
///
/// The engine queries these once when a tier is configured and caches them for
/// the lifetime of the tier. They must not change afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Values are kept in native form and exchanged as [`Payload::Native`].
    pub volatile: bool,
    /// The store implements [`CacheStore::flush_by_tag`] and
    /// [`CacheStore::find_identifiers_by_tag`].
    pub taggable: bool,
}

impl Capabilities {
    /// A store holding native values without tag support.
    #[must_use]
    pub const fn volatile() -> Self {
        Self {
            volatile: true,
            taggable: false,
        }
    }

    /// A store holding serialized values without tag support.
    #[must_use]
    pub const fn serialized() -> Self {
        Self {
            volatile: false,
            taggable: false,
        }
    }

    /// Returns a copy with tag support enabled.
    #[must_use]
    pub const fn with_tags(self) -> Self {
        Self { taggable: true, ..self }
    }
}

/// Trait for store implementations.
///
/// All operations are synchronous. A store that is safe to call concurrently
/// makes the composed multilevel cache safe for the same access pattern; the engine
/// adds no locking of its own around store calls.
///
/// Required methods: `capabilities`, `get`, `set`, `has`, `remove`, `flush` and
/// `collect_garbage`.
///
/// Optional methods and their defaults:
/// - `flush_by_tag`, `find_identifiers_by_tag`: return [`Error::unsupported`]
/// - `initialize`: does nothing
/// - `bind_frontend`: ignores the frontend
/// - `schema`: returns `None`
pub trait CacheStore<V>: Send + Sync {
    /// Returns the capabilities of this store.
    fn capabilities(&self) -> Capabilities;

    /// Gets a value, returning `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Payload<V>>, Error>;

    /// Stores a value under `key` with the given tags and optional lifetime.
    fn set(&self, key: &str, payload: Payload<V>, tags: &[&str], ttl: Option<Duration>) -> Result<(), Error>;

    /// Returns `true` if a value is stored under `key`.
    fn has(&self, key: &str) -> Result<bool, Error>;

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Removes every entry.
    fn flush(&self) -> Result<(), Error>;

    /// Drops expired entries.
    fn collect_garbage(&self) -> Result<(), Error>;

    /// Removes every entry carrying `tag`.
    fn flush_by_tag(&self, tag: &str) -> Result<(), Error> {
        let _ = tag;
        Err(Error::unsupported("flush_by_tag"))
    }

    /// Returns the identifiers of every entry carrying `tag`.
    fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, Error> {
        let _ = tag;
        Err(Error::unsupported("find_identifiers_by_tag"))
    }

    /// Runs store-specific setup after construction.
    ///
    /// Called exactly once, before the store is installed as a tier.
    fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Binds the store to the logical cache it serves.
    fn bind_frontend(&self, frontend: &Frontend) {
        let _ = frontend;
    }

    /// Returns the persistent-storage schema this store requires, if any.
    ///
    /// The schema is opaque to the engine and handed to the host unmodified.
    fn schema(&self) -> Option<String> {
        None
    }
}

impl<V, S> CacheStore<V> for Box<S>
where
    S: CacheStore<V> + ?Sized,
{
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn get(&self, key: &str) -> Result<Option<Payload<V>>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, payload: Payload<V>, tags: &[&str], ttl: Option<Duration>) -> Result<(), Error> {
        (**self).set(key, payload, tags, ttl)
    }

    fn has(&self, key: &str) -> Result<bool, Error> {
        (**self).has(key)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }

    fn collect_garbage(&self) -> Result<(), Error> {
        (**self).collect_garbage()
    }

    fn flush_by_tag(&self, tag: &str) -> Result<(), Error> {
        (**self).flush_by_tag(tag)
    }

    fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, Error> {
        (**self).find_identifiers_by_tag(tag)
    }

    fn initialize(&self) -> Result<(), Error> {
        (**self).initialize()
    }

    fn bind_frontend(&self, frontend: &Frontend) {
        (**self).bind_frontend(frontend);
    }

    fn schema(&self) -> Option<String> {
        (**self).schema()
    }
}
