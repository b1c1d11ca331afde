// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The multilevel cache engine.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use multilevel_store::{Frontend, Payload};
use parking_lot::RwLock;

use crate::error::TierFailure;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};
use crate::{CacheValue, Error, Result, StoreRegistry, Tier, TierConfig, codec};

type TierList<V> = Arc<[Tier<V>]>;

/// A cache composed of an ordered list of tiers, fastest first.
///
/// Reads are served by the first tier holding the key; the value is then promoted
/// into every faster tier that accepts writes. Writes, removals and flushes fan out
/// to every tier whose policy accepts them. Tier failures on reads count as misses;
/// failures on writes are collected and reported together once every tier was tried.
///
/// The cache starts unconfigured. Every operation except [`configure`](Self::configure),
/// [`set_tiers`](Self::set_tiers) and [`bind_frontend`](Self::bind_frontend) fails
/// with [`ErrorKind::NotConfigured`](crate::ErrorKind::NotConfigured) until tiers are installed.
/// Reconfiguring swaps the whole tier list at once; an operation in flight keeps
/// the list it started with.
///
/// # Examples
///
/// ```
/// use multilevel::{Tier, TieredCache};
/// use multilevel_memory::InMemoryStore;
///
/// let l1 = InMemoryStore::<String>::new();
/// let l2 = InMemoryStore::<String>::new();
///
/// let cache = TieredCache::new("pages");
/// cache.set_tiers(vec![Tier::new(l1.clone()), Tier::new(l2.clone())])?;
///
/// cache.set("home", &"<html>".to_string(), &["layout"], None)?;
/// assert_eq!(cache.get("home")?, Some("<html>".to_string()));
///
/// cache.flush_by_tag("layout")?;
/// assert!(!cache.has("home")?);
/// # Ok::<(), multilevel::Error>(())
/// ```
pub struct TieredCache<V> {
    name: String,
    registry: StoreRegistry<V>,
    tiers: RwLock<Option<TierList<V>>>,
    frontend: RwLock<Option<Frontend>>,
    telemetry: CacheTelemetry,
}

impl<V> fmt::Debug for TieredCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCache")
            .field("name", &self.name)
            .field("tiers", &self.tiers.read().as_deref())
            .field("frontend", &*self.frontend.read())
            .finish_non_exhaustive()
    }
}

impl<V: CacheValue> TieredCache<V> {
    /// Creates an unconfigured cache.
    ///
    /// With the `memory` feature, [`configure`](Self::configure) resolves store kinds
    /// through [`StoreRegistry::with_defaults`]; otherwise the registry is empty.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        #[cfg(feature = "memory")]
        let registry = StoreRegistry::with_defaults();
        #[cfg(not(feature = "memory"))]
        let registry = StoreRegistry::new();

        Self::with_registry(name, registry)
    }

    /// Creates an unconfigured cache that resolves store kinds through `registry`.
    #[must_use]
    pub fn with_registry(name: impl Into<String>, registry: StoreRegistry<V>) -> Self {
        Self {
            name: name.into(),
            registry,
            tiers: RwLock::new(None),
            frontend: RwLock::new(None),
            telemetry: CacheTelemetry::default(),
        }
    }

    /// Turns event logging on or off. On by default when the `logs` feature is enabled.
    #[must_use]
    pub fn logging(mut self, enabled: bool) -> Self {
        self.telemetry = CacheTelemetry::new(enabled);
        self
    }

    /// Returns the name of the logical cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the registry used by [`configure`](Self::configure).
    #[must_use]
    pub fn registry(&self) -> &StoreRegistry<V> {
        &self.registry
    }

    /// Returns `true` once tiers are installed.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.tiers.read().is_some()
    }

    /// Returns the number of installed tiers, or zero while unconfigured.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.read().as_ref().map_or(0, |tiers| tiers.len())
    }

    /// Builds a tier for every configuration and installs them as the new tier list.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a store kind is unknown, a store cannot be
    /// constructed, or a store fails to initialize. The previous tier list, if any,
    /// stays in place.
    pub fn configure(&self, configs: &[TierConfig]) -> Result<()> {
        let tiers = configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                self.registry.build_tier(config).inspect_err(|e| {
                    self.record_failure(Some(index), CacheOperation::Configure, CacheActivity::Error, e);
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.set_tiers(tiers)
    }

    /// Installs already built tiers as the new tier list.
    ///
    /// Every store is initialized and bound to the current frontend before the
    /// list becomes visible to cache operations.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a store fails to initialize. The previous
    /// tier list, if any, stays in place.
    pub fn set_tiers(&self, tiers: Vec<Tier<V>>) -> Result<()> {
        for (index, tier) in tiers.iter().enumerate() {
            tier.store().initialize().map_err(|e| {
                self.record_failure(Some(index), CacheOperation::Configure, CacheActivity::Error, &e);
                Error::configuration(format!("tier {index} failed to initialize: {e}"))
            })?;
        }

        // Holding the frontend lock keeps a concurrent bind_frontend from missing the new tiers.
        let frontend = self.frontend.read();
        if let Some(frontend) = frontend.as_ref() {
            for tier in &tiers {
                tier.store().bind_frontend(frontend);
            }
        }

        let count = tiers.len();
        *self.tiers.write() = Some(Arc::from(tiers));
        drop(frontend);

        self.record(None, CacheOperation::Configure, CacheActivity::Configured, Some(&format_args!("{count} tiers")));
        Ok(())
    }

    /// Binds every tier, current and future, to the logical cache's frontend.
    pub fn bind_frontend(&self, frontend: Frontend) {
        let mut current = self.frontend.write();
        if let Some(tiers) = self.tiers.read().as_ref() {
            for tier in tiers.iter() {
                tier.store().bind_frontend(&frontend);
            }
        }
        *current = Some(frontend);
    }

    /// Returns the frontend bound with [`bind_frontend`](Self::bind_frontend).
    #[must_use]
    pub fn frontend(&self) -> Option<Frontend> {
        self.frontend.read().clone()
    }

    /// Looks up `key`, returning `None` if no tier holds it.
    ///
    /// Tiers are consulted fastest first and the first hit wins. The value is then
    /// written, without tags or lifetime, to every faster tier that cascades writes.
    /// Those promotion writes are best effort and never fail the lookup.
    ///
    /// # Errors
    ///
    /// Fails only if the cache is not configured. A tier that fails the lookup or
    /// returns an undecodable value is treated as a miss.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        let tiers = self.snapshot(CacheOperation::Get)?;

        for (index, tier) in tiers.iter().enumerate() {
            let found = tier.store().get(&tier.key(key)).and_then(|payload| payload.map(codec::decode).transpose());

            match found {
                Ok(Some(value)) => {
                    self.record(Some(index), CacheOperation::Get, CacheActivity::Hit, None);
                    self.promote(&tiers[..index], key, &value);
                    return Ok(Some(value));
                }
                Ok(None) => self.record(Some(index), CacheOperation::Get, CacheActivity::Miss, None),
                Err(e) => self.record_failure(Some(index), CacheOperation::Get, CacheActivity::TierFailed, &e),
            }
        }

        Ok(None)
    }

    /// Writes `value` to every tier that cascades writes.
    ///
    /// Tiers that do not hold native values receive the value serialized.
    ///
    /// # Errors
    ///
    /// Returns a tier operation error listing every tier that failed; the other
    /// tiers were still written. Nothing is rolled back.
    pub fn set(&self, key: &str, value: &V, tags: &[&str], ttl: Option<Duration>) -> Result<()> {
        let tiers = self.snapshot(CacheOperation::Set)?;
        let mut encoded = EncodedValue::new(value);

        self.fan_out(&tiers, CacheOperation::Set, "set", |tier| tier.policy().cascades_on_write(), |tier| {
            let payload = encoded.payload_for(tier)?;
            tier.store().set(&tier.key(key), payload, tags, ttl)
        })
    }

    /// Returns `true` if any tier holds `key`.
    ///
    /// Stops at the first tier reporting the key and never promotes.
    ///
    /// # Errors
    ///
    /// Fails only if the cache is not configured. A failing tier counts as not
    /// holding the key.
    pub fn has(&self, key: &str) -> Result<bool> {
        let tiers = self.snapshot(CacheOperation::Has)?;

        for (index, tier) in tiers.iter().enumerate() {
            match tier.store().has(&tier.key(key)) {
                Ok(true) => {
                    self.record(Some(index), CacheOperation::Has, CacheActivity::Hit, None);
                    return Ok(true);
                }
                Ok(false) => self.record(Some(index), CacheOperation::Has, CacheActivity::Miss, None),
                Err(e) => self.record_failure(Some(index), CacheOperation::Has, CacheActivity::TierFailed, &e),
            }
        }

        Ok(false)
    }

    /// Removes `key` from every tier that cascades writes.
    ///
    /// # Errors
    ///
    /// Returns a tier operation error listing every tier that failed.
    pub fn remove(&self, key: &str) -> Result<()> {
        let tiers = self.snapshot(CacheOperation::Remove)?;
        self.fan_out(&tiers, CacheOperation::Remove, "remove", |tier| tier.policy().cascades_on_write(), |tier| {
            tier.store().remove(&tier.key(key))
        })
    }

    /// Flushes every tier that participates in flushes.
    ///
    /// # Errors
    ///
    /// Returns a tier operation error listing every tier that failed.
    pub fn flush(&self) -> Result<()> {
        let tiers = self.snapshot(CacheOperation::Flush)?;
        self.fan_out(&tiers, CacheOperation::Flush, "flush", |tier| tier.policy().participates_in_flush(), |tier| {
            tier.store().flush()
        })
    }

    /// Removes every entry tagged `tag` from the tiers that participate in flushes.
    ///
    /// A participating tier without tag support is flushed in full.
    ///
    /// # Errors
    ///
    /// Returns a tier operation error listing every tier that failed.
    pub fn flush_by_tag(&self, tag: &str) -> Result<()> {
        let tiers = self.snapshot(CacheOperation::FlushByTag)?;
        let mut failures = Vec::new();

        for (index, tier) in tiers.iter().enumerate() {
            if !tier.policy().participates_in_flush() {
                continue;
            }

            let (operation, outcome) = if tier.is_taggable() {
                ("flush_by_tag", tier.store().flush_by_tag(tag))
            } else {
                self.record(Some(index), CacheOperation::FlushByTag, CacheActivity::TagFallback, None);
                ("flush", tier.store().flush())
            };

            if let Err(e) = outcome {
                failures.push(TierFailure::new(index, operation, e));
            }
        }

        self.finish(CacheOperation::FlushByTag, failures)
    }

    /// Returns the logical keys of every entry tagged `tag`, across all tiers with tag support.
    ///
    /// On a prefixed tier, exactly the prefix length is cut from every identifier,
    /// whether or not it starts with the prefix.
    ///
    /// # Errors
    ///
    /// Fails only if the cache is not configured. A failing tier contributes nothing.
    pub fn find_identifiers_by_tag(&self, tag: &str) -> Result<BTreeSet<String>> {
        let tiers = self.snapshot(CacheOperation::FindIdentifiersByTag)?;
        let mut identifiers = BTreeSet::new();

        for (index, tier) in tiers.iter().enumerate() {
            if !tier.is_taggable() {
                continue;
            }

            match tier.store().find_identifiers_by_tag(tag) {
                Ok(found) => identifiers.extend(found.into_iter().filter_map(|identifier| tier.logical_key(identifier))),
                Err(e) => self.record_failure(
                    Some(index),
                    CacheOperation::FindIdentifiersByTag,
                    CacheActivity::TierFailed,
                    &e,
                ),
            }
        }

        Ok(identifiers)
    }

    /// Asks every tier to drop expired entries.
    ///
    /// # Errors
    ///
    /// Returns a tier operation error listing every tier that failed.
    pub fn collect_garbage(&self) -> Result<()> {
        let tiers = self.snapshot(CacheOperation::CollectGarbage)?;
        self.fan_out(&tiers, CacheOperation::CollectGarbage, "collect_garbage", |_| true, |tier| {
            tier.store().collect_garbage()
        })
    }

    /// Returns the storage schema every tier requires, in tier order.
    ///
    /// Each declaration is preceded by a newline. Tiers without a schema contribute nothing.
    ///
    /// # Errors
    ///
    /// Fails if the cache is not configured.
    pub fn table_definitions(&self) -> Result<String> {
        let tiers = self.current().ok_or_else(|| Error::not_configured(&self.name))?;
        Ok(tiers
            .iter()
            .filter_map(|tier| tier.store().schema())
            .fold(String::new(), |mut definitions, schema| {
                definitions.push('\n');
                definitions.push_str(&schema);
                definitions
            }))
    }

    fn current(&self) -> Option<TierList<V>> {
        self.tiers.read().clone()
    }

    fn snapshot(&self, operation: CacheOperation) -> Result<TierList<V>> {
        self.current().ok_or_else(|| {
            let error = Error::not_configured(&self.name);
            self.record_failure(None, operation, CacheActivity::Error, &error);
            error
        })
    }

    fn promote(&self, faster: &[Tier<V>], key: &str, value: &V) {
        let mut encoded = EncodedValue::new(value);

        for (index, tier) in faster.iter().enumerate() {
            if !tier.policy().cascades_on_write() {
                continue;
            }

            let written = encoded
                .payload_for(tier)
                .and_then(|payload| tier.store().set(&tier.key(key), payload, &[], None));

            match written {
                Ok(()) => self.record(Some(index), CacheOperation::Get, CacheActivity::Promoted, None),
                Err(e) => self.record_failure(Some(index), CacheOperation::Get, CacheActivity::PromotionFailed, &e),
            }
        }
    }

    /// Applies `operation` to every tier `eligible` accepts and aggregates the failures.
    fn fan_out(
        &self,
        tiers: &[Tier<V>],
        operation: CacheOperation,
        store_operation: &'static str,
        eligible: impl Fn(&Tier<V>) -> bool,
        mut apply: impl FnMut(&Tier<V>) -> multilevel_store::Result<()>,
    ) -> Result<()> {
        let failures = tiers
            .iter()
            .enumerate()
            .filter(|&(_, tier)| eligible(tier))
            .filter_map(|(index, tier)| apply(tier).err().map(|e| TierFailure::new(index, store_operation, e)))
            .collect();

        self.finish(operation, failures)
    }

    fn finish(&self, operation: CacheOperation, failures: Vec<TierFailure>) -> Result<()> {
        if failures.is_empty() {
            self.record(None, operation, CacheActivity::Ok, None);
            return Ok(());
        }

        for failure in &failures {
            self.record_failure(Some(failure.tier()), operation, CacheActivity::TierFailed, failure.error());
        }
        let error = Error::tier_operation(failures);
        self.record_failure(None, operation, CacheActivity::Error, &error);
        Err(error)
    }

    fn record(&self, tier: Option<usize>, operation: CacheOperation, activity: CacheActivity, detail: Option<&dyn fmt::Display>) {
        self.telemetry.record(&self.name, tier, operation, activity, detail);
    }

    fn record_failure(&self, tier: Option<usize>, operation: CacheOperation, activity: CacheActivity, error: &dyn fmt::Display) {
        self.record(tier, operation, activity, Some(error));
    }
}

/// Serializes a value at most once, on first demand by a non-volatile tier.
struct EncodedValue<'a, V> {
    value: &'a V,
    bytes: Option<std::result::Result<Vec<u8>, String>>,
}

impl<'a, V: CacheValue> EncodedValue<'a, V> {
    fn new(value: &'a V) -> Self {
        Self { value, bytes: None }
    }

    fn payload_for(&mut self, tier: &Tier<V>) -> multilevel_store::Result<Payload<V>> {
        if tier.is_volatile() {
            return Ok(Payload::Native(self.value.clone()));
        }

        let value = self.value;
        let bytes = self
            .bytes
            .get_or_insert_with(|| codec::encode(value).map_err(|e| e.to_string()));

        match bytes {
            Ok(bytes) => Ok(Payload::Serialized(bytes.clone())),
            Err(message) => Err(multilevel_store::Error::from_message(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use multilevel_store::testing::{MockStore, StoreOp};

    use super::*;

    #[test]
    fn encoded_value_matches_tier_volatility() {
        let value = "v".to_string();
        let mut encoded = EncodedValue::new(&value);

        let volatile = Tier::new(MockStore::<String>::new());
        let durable = Tier::new(MockStore::<String>::serialized());

        assert_eq!(encoded.payload_for(&volatile).expect("native"), Payload::Native(value.clone()));
        assert_eq!(
            encoded.payload_for(&durable).expect("serialized"),
            Payload::Serialized(b"\"v\"".to_vec())
        );
        assert!(encoded.bytes.is_some());
    }

    #[test]
    fn volatile_tiers_never_trigger_encoding() {
        let value = 42_u32;
        let mut encoded = EncodedValue::new(&value);

        encoded.payload_for(&Tier::new(MockStore::<u32>::new())).expect("native");

        assert!(encoded.bytes.is_none());
    }

    #[cfg(feature = "logs")]
    mod logs {
        use super::*;
        use crate::telemetry::testing::LogCapture;

        fn two_tiers(l1: &MockStore<String>, l2: &MockStore<String>) -> TieredCache<String> {
            let cache = TieredCache::new("logged");
            cache
                .set_tiers(vec![Tier::new(l1.clone()), Tier::new(l2.clone())])
                .expect("tiers should install");
            cache
        }

        #[test]
        fn configuration_is_logged() {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());

            two_tiers(&MockStore::new(), &MockStore::new());

            capture.assert_contains("INFO");
            capture.assert_contains("cache.configured");
            capture.assert_contains("2 tiers");
        }

        #[test]
        fn promotion_failure_is_a_warning() {
            let l1 = MockStore::new();
            let l2 = MockStore::new();
            l2.seed("k", Payload::Native("v".to_string()), &[]);
            l1.fail_when(StoreOp::is_write);
            let cache = two_tiers(&l1, &l2);

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            assert_eq!(cache.get("k").expect("get"), Some("v".to_string()));

            capture.assert_contains("WARN");
            capture.assert_contains("cache.promotion_failed");
            capture.assert_not_contains("cache.promoted");
        }

        #[test]
        fn successful_promotion_is_logged() {
            let l1 = MockStore::new();
            let l2 = MockStore::new();
            l2.seed("k", Payload::Native("v".to_string()), &[]);
            let cache = two_tiers(&l1, &l2);

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            cache.get("k").expect("get");

            capture.assert_contains("cache.miss");
            capture.assert_contains("cache.hit");
            capture.assert_contains("cache.promoted");
        }

        #[test]
        fn tag_fallback_is_logged() {
            let l1 = MockStore::new().without_tags();
            let l2 = MockStore::new();
            let cache = two_tiers(&l1, &l2);

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            cache.flush_by_tag("layout").expect("flush_by_tag");

            capture.assert_contains("cache.tag_fallback");
            capture.assert_contains("cache.ok");
        }

        #[test]
        fn write_failures_are_logged_per_tier_and_overall() {
            let l1 = MockStore::new();
            let l2 = MockStore::new();
            l2.fail_when(StoreOp::is_write);
            let cache = two_tiers(&l1, &l2);

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            cache.set("k", &"v".to_string(), &[], None).expect_err("set should fail");

            capture.assert_contains("cache.tier_failed");
            capture.assert_contains("ERROR");
            capture.assert_contains("cache.error");
        }

        #[test]
        fn unconfigured_access_is_an_error_event() {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());

            TieredCache::<String>::new("idle").get("k").expect_err("unconfigured");

            capture.assert_contains("ERROR");
            capture.assert_contains("idle");
        }

        #[test]
        fn disabled_logging_is_silent() {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());

            let cache = TieredCache::<String>::new("quiet").logging(false);
            cache.set_tiers(vec![Tier::new(MockStore::new())]).expect("tiers should install");
            cache.get("k").expect("get");

            assert!(capture.output().is_empty());
        }
    }
}
