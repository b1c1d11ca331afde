// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolution of store kinds to store constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use multilevel_store::CacheStore;

use crate::{Error, Result, StoreOptions, Tier, TierConfig};

/// Store kind registered by [`StoreRegistry::with_defaults`] for [`multilevel_memory::InMemoryStore`].
#[cfg(feature = "memory")]
pub const MEMORY_STORE_KIND: &str = "memory";

type StoreFactory<V> = dyn Fn(&StoreOptions) -> multilevel_store::Result<Box<dyn CacheStore<V>>> + Send + Sync;

/// Maps store-kind identifiers to store constructors.
///
/// [`TieredCache::configure`](crate::TieredCache::configure) resolves every
/// [`TierConfig`] through a registry. Kinds are plain strings chosen by the host.
///
/// # Examples
///
/// ```
/// use multilevel::{StoreRegistry, TierConfig};
/// use multilevel_memory::InMemoryStore;
///
/// let registry = StoreRegistry::<String>::new()
///     .with_store("scratch", |_options| Ok(InMemoryStore::<String>::with_capacity(16)));
///
/// assert!(registry.contains("scratch"));
/// assert!(registry.build_tier(&TierConfig::new("scratch")).is_ok());
/// assert!(registry.build_tier(&TierConfig::new("redis")).is_err());
/// ```
pub struct StoreRegistry<V> {
    factories: HashMap<String, Arc<StoreFactory<V>>>,
    default_kind: Option<String>,
}

impl<V> fmt::Debug for StoreRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("kinds", &self.kinds())
            .field("default_kind", &self.default_kind)
            .finish()
    }
}

impl<V> Clone for StoreRegistry<V> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
            default_kind: self.default_kind.clone(),
        }
    }
}

impl<V> Default for StoreRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StoreRegistry<V> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            default_kind: None,
        }
    }

    /// Registers a constructor for `kind`, replacing any previous one.
    pub fn register<S, F>(&mut self, kind: impl Into<String>, factory: F)
    where
        V: 'static,
        S: CacheStore<V> + 'static,
        F: Fn(&StoreOptions) -> multilevel_store::Result<S> + Send + Sync + 'static,
    {
        let factory = move |options: &StoreOptions| -> multilevel_store::Result<Box<dyn CacheStore<V>>> {
            Ok(Box::new(factory(options)?))
        };
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Registers a constructor for `kind` and returns the registry.
    #[must_use]
    pub fn with_store<S, F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        V: 'static,
        S: CacheStore<V> + 'static,
        F: Fn(&StoreOptions) -> multilevel_store::Result<S> + Send + Sync + 'static,
    {
        self.register(kind, factory);
        self
    }

    /// Sets the kind used for tier configurations that name no store.
    #[must_use]
    pub fn with_default_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_kind = Some(kind.into());
        self
    }

    /// Returns the kind used for tier configurations that name no store.
    #[must_use]
    pub fn default_kind(&self) -> Option<&str> {
        self.default_kind.as_deref()
    }

    /// Returns `true` if a constructor is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns the registered kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Constructs a store of the given kind.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no kind is given and there is no default,
    /// when the kind is unknown, or when the constructor fails.
    pub fn create(&self, kind: Option<&str>, options: &StoreOptions) -> Result<Box<dyn CacheStore<V>>> {
        let kind = kind
            .or(self.default_kind.as_deref())
            .ok_or_else(|| Error::configuration("tier names no store kind and the registry has no default kind"))?;

        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| Error::configuration(format!("unknown store kind '{kind}'")))?;

        factory(options).map_err(|e| Error::configuration(format!("cannot construct store of kind '{kind}': {e}")))
    }

    /// Constructs the store a tier configuration names and wraps it with its policy.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn build_tier(&self, config: &TierConfig) -> Result<Tier<V>> {
        let store = self.create(config.store.as_deref(), &config.options)?;
        Ok(Tier::from_boxed(store).with_policy(config.resolve_policy()))
    }
}

#[cfg(feature = "memory")]
impl<V> StoreRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a registry with the built-in store kinds.
    ///
    /// Registers [`MEMORY_STORE_KIND`], which accepts the options `max_capacity`,
    /// `initial_capacity`, `time_to_live_secs` and `time_to_idle_secs`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new().with_store(MEMORY_STORE_KIND, memory_store)
    }
}

#[cfg(feature = "memory")]
fn memory_store<V>(options: &StoreOptions) -> multilevel_store::Result<multilevel_memory::InMemoryStore<V>>
where
    V: Clone + Send + Sync + 'static,
{
    let mut builder = multilevel_memory::InMemoryStore::<V>::builder();

    if let Some(capacity) = options.u64("max_capacity")? {
        builder = builder.max_capacity(capacity);
    }
    if let Some(capacity) = options.u64("initial_capacity")? {
        let capacity = usize::try_from(capacity).map_err(multilevel_store::Error::from_message)?;
        builder = builder.initial_capacity(capacity);
    }
    if let Some(ttl) = options.secs("time_to_live_secs")? {
        builder = builder.time_to_live(ttl);
    }
    if let Some(tti) = options.secs("time_to_idle_secs")? {
        builder = builder.time_to_idle(tti);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use multilevel_store::testing::MockStore;

    use super::*;

    #[test]
    fn unknown_kind_is_a_configuration_error() {
        let registry = StoreRegistry::<i32>::new();
        let Err(error) = registry.create(Some("redis"), &StoreOptions::new()) else {
            panic!("unknown kind should not resolve");
        };
        assert!(error.is_configuration());
        assert!(error.to_string().contains("redis"));
    }

    #[test]
    fn missing_kind_uses_default() {
        let registry = StoreRegistry::<i32>::new()
            .with_store("mock", |_| Ok(MockStore::<i32>::serialized()))
            .with_default_kind("mock");

        let tier = registry.build_tier(&TierConfig::default()).expect("default kind should resolve");
        assert!(!tier.is_volatile());
    }

    #[test]
    fn missing_kind_without_default_fails() {
        let registry = StoreRegistry::<i32>::new().with_store("mock", |_| Ok(MockStore::<i32>::new()));
        assert!(registry.build_tier(&TierConfig::default()).expect_err("should fail").is_configuration());
    }

    #[test]
    fn constructor_failure_is_a_configuration_error() {
        let registry = StoreRegistry::<i32>::new().with_store("picky", |options| {
            options.str("path")?;
            Ok(MockStore::<i32>::new())
        });

        let config = TierConfig::new("picky").with_options(StoreOptions::new().with("path", 3));
        let error = registry.build_tier(&config).expect_err("should fail");
        assert!(error.is_configuration());
        assert!(error.to_string().contains("path"), "got: {error}");
    }

    #[test]
    fn kinds_are_sorted() {
        let registry = StoreRegistry::<i32>::new()
            .with_store("b", |_| Ok(MockStore::<i32>::new()))
            .with_store("a", |_| Ok(MockStore::<i32>::new()));
        assert_eq!(registry.kinds(), vec!["a", "b"]);
    }

    #[cfg(feature = "memory")]
    #[test]
    fn defaults_register_memory_store() {
        let registry = StoreRegistry::<i32>::with_defaults();
        let config = TierConfig::new(MEMORY_STORE_KIND).with_options(
            StoreOptions::new()
                .with("max_capacity", 10)
                .with("initial_capacity", 4)
                .with("time_to_live_secs", 60),
        );

        let tier = registry.build_tier(&config).expect("memory tier should build");
        assert!(tier.is_volatile());
        assert!(tier.is_taggable());
        assert_eq!(registry.default_kind(), None);
    }
}
