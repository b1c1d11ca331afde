// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.
//!
//! The builder keeps moka out of the public API: callers describe capacity and
//! expiration, and [`InMemoryStoreBuilder::build`] translates that into a moka cache.

use std::marker::PhantomData;
use std::time::Duration;

use crate::store::InMemoryStore;

/// Builder for configuring an [`InMemoryStore`].
///
/// # Examples
///
/// ```
/// use multilevel_memory::InMemoryStore;
/// use std::time::Duration;
///
/// let store = InMemoryStore::<String>::builder()
///     .max_capacity(1000)
///     .time_to_live(Duration::from_secs(300))
///     .time_to_idle(Duration::from_secs(60))
///     .initial_capacity(100)
///     .name("pages-l1")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder<V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<V>,
}

impl<V> Default for InMemoryStoreBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryStoreBuilder<V> {
    /// Creates a builder for an unbounded store without store-wide expiration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Caps the number of entries.
    ///
    /// Beyond the cap, moka evicts entries using `TinyLFU`. Eviction is the store's
    /// business; the multilevel engine never evicts on its own.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocates room for `capacity` entries.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Expires every entry `duration` after it was written.
    ///
    /// A shorter lifetime passed to `set` for a single entry still applies; the
    /// earlier deadline wins.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Expires every entry that has not been read or written for `duration`.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the underlying moka cache, for debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured store.
    #[must_use]
    pub fn build(self) -> InMemoryStore<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        InMemoryStore::from_builder(&self)
    }
}
