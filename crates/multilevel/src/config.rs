// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serializable tier configuration.
//!
//! A [`TierConfig`] names the kind of store to build, the options handed to its
//! constructor and the policy the engine applies to it. Configurations are plain
//! `serde` records, so hosts can keep them in JSON.
//!
//! ```
//! use multilevel::TierConfig;
//!
//! let config: TierConfig = serde_json::from_str(
//!     r#"{ "store": "memory", "options": { "max_capacity": 100 }, "policy": { "cascade": false } }"#,
//! )?;
//!
//! assert_eq!(config.store.as_deref(), Some("memory"));
//! assert!(!config.resolve_policy().cascades_on_write());
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::time::Duration;

use multilevel_store::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TierPolicy;

/// Construction options handed to a store constructor.
///
/// A thin wrapper over a JSON object with typed accessors. Accessors return
/// `Ok(None)` for a missing option and an error for an option of the wrong type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreOptions(Map<String, Value>);

impl StoreOptions {
    /// Creates an empty set of options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Sets an option, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Returns the raw value of an option.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns `true` if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads an unsigned integer option.
    pub fn u64(&self, name: &str) -> Result<Option<u64>, Error> {
        self.typed(name, "an unsigned integer", Value::as_u64)
    }

    /// Reads a boolean option.
    pub fn bool(&self, name: &str) -> Result<Option<bool>, Error> {
        self.typed(name, "a boolean", Value::as_bool)
    }

    /// Reads a string option.
    pub fn str(&self, name: &str) -> Result<Option<&str>, Error> {
        self.typed(name, "a string", Value::as_str)
    }

    /// Reads a duration given in whole seconds.
    pub fn secs(&self, name: &str) -> Result<Option<Duration>, Error> {
        Ok(self.u64(name)?.map(Duration::from_secs))
    }

    /// Deserializes all options into a constructor-specific record.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        T::deserialize(&Value::Object(self.0.clone())).map_err(Error::from_message)
    }

    fn typed<'a, T>(&'a self, name: &str, expected: &str, read: impl FnOnce(&'a Value) -> Option<T>) -> Result<Option<T>, Error> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => read(value)
                .map(Some)
                .ok_or_else(|| Error::from_message(format!("option '{name}' must be {expected}, got {value}"))),
        }
    }
}

impl From<Map<String, Value>> for StoreOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Policy block of a [`TierConfig`].
///
/// Unset fields take the [`TierPolicy`] defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicyConfig {
    /// Whether writes, removals and promotions reach the tier.
    #[serde(alias = "cascade", skip_serializing_if = "Option::is_none")]
    pub cascade_on_write: Option<bool>,
    /// Whether flushes reach the tier.
    #[serde(alias = "flush", skip_serializing_if = "Option::is_none")]
    pub participates_in_flush: Option<bool>,
    /// Key prefix for the tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Asks the layered configuration builder to prefix this tier with the name of
    /// the cache it is layered into, and to always cascade writes to it.
    ///
    /// Use it for a tier whose store is shared by several logical caches.
    /// The engine itself ignores the flag.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_prefix_to_target_name: bool,
}

impl TierPolicyConfig {
    /// Resolves the configured values against the defaults.
    #[must_use]
    pub fn resolve(&self) -> TierPolicy {
        let mut policy = TierPolicy::new()
            .cascade_on_write(self.cascade_on_write.unwrap_or(true))
            .flush_participation(self.participates_in_flush.unwrap_or(true));
        if let Some(prefix) = &self.prefix {
            policy = policy.prefix(prefix.clone());
        }
        policy
    }
}

/// Configuration of one tier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Store kind, as registered in a [`StoreRegistry`](crate::StoreRegistry).
    ///
    /// When absent, the registry's default kind is used.
    #[serde(alias = "backend", skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Options handed to the store constructor.
    #[serde(skip_serializing_if = "StoreOptions::is_empty")]
    pub options: StoreOptions,
    /// Policy applied by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<TierPolicyConfig>,
}

impl TierConfig {
    /// Creates a configuration for a store of the given kind.
    #[must_use]
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: Some(store.into()),
            ..Self::default()
        }
    }

    /// Sets the constructor options.
    #[must_use]
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the policy block.
    #[must_use]
    pub fn with_policy(mut self, policy: TierPolicyConfig) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Returns the effective policy.
    #[must_use]
    pub fn resolve_policy(&self) -> TierPolicy {
        self.policy.as_ref().map(TierPolicyConfig::resolve).unwrap_or_default()
    }

    pub(crate) fn forces_prefix_to_target_name(&self) -> bool {
        self.policy.as_ref().is_some_and(|policy| policy.force_prefix_to_target_name)
    }
}
