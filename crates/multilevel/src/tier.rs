// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tier descriptors: one store bound to the policy the engine applies to it.

use std::borrow::Cow;
use std::fmt;

use multilevel_store::{CacheStore, Capabilities};

/// Per-tier policy.
///
/// Defaults forward writes and flushes to the tier and leave keys unprefixed.
///
/// # Examples
///
/// ```
/// use multilevel::TierPolicy;
///
/// let policy = TierPolicy::new().cascade_on_write(false).prefix("pages_");
/// assert!(!policy.cascades_on_write());
/// assert!(policy.participates_in_flush());
/// assert_eq!(policy.key_prefix(), Some("pages_"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TierPolicy {
    cascade_on_write: bool,
    participates_in_flush: bool,
    prefix: Option<String>,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl TierPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cascade_on_write: true,
            participates_in_flush: true,
            prefix: None,
        }
    }

    /// Sets whether `set`, `remove` and read promotions reach the tier.
    #[must_use]
    pub fn cascade_on_write(mut self, enabled: bool) -> Self {
        self.cascade_on_write = enabled;
        self
    }

    /// Sets whether `flush` and `flush_by_tag` reach the tier.
    #[must_use]
    pub fn flush_participation(mut self, enabled: bool) -> Self {
        self.participates_in_flush = enabled;
        self
    }

    /// Prepends `prefix` to every key routed to the tier.
    ///
    /// An empty prefix is the same as no prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Returns whether writes are forwarded to the tier.
    #[must_use]
    pub fn cascades_on_write(&self) -> bool {
        self.cascade_on_write
    }

    /// Returns whether flushes are forwarded to the tier.
    #[must_use]
    pub fn participates_in_flush(&self) -> bool {
        self.participates_in_flush
    }

    /// Returns the key prefix, if any.
    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// One store of a multilevel cache together with its policy.
///
/// The descriptor owns its store exclusively. Capabilities are read from the
/// store once, when the descriptor is created, and never re-queried.
///
/// # Examples
///
/// ```
/// use multilevel::{Tier, TierPolicy};
/// use multilevel_memory::InMemoryStore;
///
/// let tier = Tier::new(InMemoryStore::<String>::new()).with_policy(TierPolicy::new().prefix("p_"));
/// assert!(tier.is_volatile());
/// assert!(tier.is_taggable());
/// assert_eq!(tier.policy().key_prefix(), Some("p_"));
/// ```
pub struct Tier<V> {
    store: Box<dyn CacheStore<V>>,
    policy: TierPolicy,
    capabilities: Capabilities,
}

impl<V> fmt::Debug for Tier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tier")
            .field("policy", &self.policy)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl<V> Tier<V> {
    /// Wraps `store` with the default policy.
    pub fn new(store: impl CacheStore<V> + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    /// Wraps an already boxed store with the default policy.
    #[must_use]
    pub fn from_boxed(store: Box<dyn CacheStore<V>>) -> Self {
        let capabilities = store.capabilities();
        Self {
            store,
            policy: TierPolicy::new(),
            capabilities,
        }
    }

    /// Replaces the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TierPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Returns the capabilities captured when the tier was created.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns `true` if the tier holds values in native form.
    #[must_use]
    pub fn is_volatile(&self) -> bool {
        self.capabilities.volatile
    }

    /// Returns `true` if the tier supports tag-indexed invalidation and lookup.
    #[must_use]
    pub fn is_taggable(&self) -> bool {
        self.capabilities.taggable
    }

    pub(crate) fn store(&self) -> &dyn CacheStore<V> {
        self.store.as_ref()
    }

    /// Maps a logical key to the key stored in this tier.
    pub(crate) fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self.policy.key_prefix() {
            Some(prefix) => Cow::Owned(format!("{prefix}{key}")),
            None => Cow::Borrowed(key),
        }
    }

    /// Maps a key stored in this tier back to the logical key.
    ///
    /// On a prefixed tier exactly `prefix.len()` leading bytes are cut, whatever
    /// they are. Returns `None` if the identifier is shorter than the prefix or
    /// the cut would split a character.
    pub(crate) fn logical_key(&self, identifier: String) -> Option<String> {
        match self.policy.key_prefix() {
            Some(prefix) => identifier.get(prefix.len()..).map(ToString::to_string),
            None => Some(identifier),
        }
    }
}
