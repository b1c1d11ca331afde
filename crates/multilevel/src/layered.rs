// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Layering of named cache definitions into multilevel tier lists.
//!
//! Hosts keep their caches as a map of named [`CacheDefinition`]s. Layering
//! turns one of them, the target, into a multilevel cache whose tiers are taken
//! from inline configurations or from other named definitions:
//!
//! ```
//! use multilevel::{CacheDefinition, CacheDefinitions, TierConfig, TierPolicyConfig};
//!
//! let mut definitions = CacheDefinitions::new();
//! definitions.insert("pages", CacheDefinition::new(TierConfig::new("database")).with_frontend("variable"));
//! definitions.insert(
//!     "runtime",
//!     CacheDefinition::new(TierConfig::new("memory").with_policy(TierPolicyConfig {
//!         force_prefix_to_target_name: true,
//!         ..TierPolicyConfig::default()
//!     })),
//! );
//!
//! let layered = definitions.layer("pages", ["runtime".into(), "pages".into()])?;
//! assert_eq!(layered.frontend.as_deref(), Some("variable"));
//! assert_eq!(layered.tiers[0].resolve_policy().key_prefix(), Some("pages"));
//! assert_eq!(layered.tiers[1].store.as_deref(), Some("database"));
//!
//! definitions.apply_layered(&layered)?;
//! # Ok::<(), multilevel::Error>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, StoreOptions, TierConfig};

/// Store kind under which layered definitions are written back.
pub const MULTILEVEL_STORE_KIND: &str = "multilevel";

const TIERS_OPTION: &str = "tiers";

/// One named cache as the host configures it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheDefinition {
    /// The front-facing accessor the cache is served through, opaque to this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<String>,
    /// The store backing the cache.
    #[serde(flatten)]
    pub tier: TierConfig,
}

impl CacheDefinition {
    /// Creates a definition backed by `tier`.
    #[must_use]
    pub fn new(tier: TierConfig) -> Self {
        Self { frontend: None, tier }
    }

    /// Sets the frontend.
    #[must_use]
    pub fn with_frontend(mut self, frontend: impl Into<String>) -> Self {
        self.frontend = Some(frontend.into());
        self
    }

    /// Returns `true` if this definition was written by [`CacheDefinitions::apply_layered`].
    #[must_use]
    pub fn is_layered(&self) -> bool {
        self.tier.store.as_deref() == Some(MULTILEVEL_STORE_KIND)
    }
}

/// A reference to the configuration of one tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierReference {
    /// The store of another named cache definition.
    Named(String),
    /// A configuration given in place.
    Inline(TierConfig),
}

impl From<&str> for TierReference {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for TierReference {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<TierConfig> for TierReference {
    fn from(config: TierConfig) -> Self {
        Self::Inline(config)
    }
}

/// The result of layering: a target cache and its resolved tiers.
#[derive(Clone, Debug, PartialEq)]
pub struct LayeredConfiguration {
    /// Name of the cache the tiers serve.
    pub target: String,
    /// Frontend carried over from the target's definition.
    pub frontend: Option<String>,
    /// Tier configurations, fastest first.
    pub tiers: Vec<TierConfig>,
}

impl LayeredConfiguration {
    /// Encodes the layout as a cache definition of kind [`MULTILEVEL_STORE_KIND`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the tiers cannot be encoded.
    pub fn to_definition(&self) -> Result<CacheDefinition> {
        let tiers = serde_json::to_value(&self.tiers).map_err(Error::configuration)?;
        Ok(CacheDefinition {
            frontend: self.frontend.clone(),
            tier: TierConfig::new(MULTILEVEL_STORE_KIND).with_options(StoreOptions::new().with(TIERS_OPTION, tiers)),
        })
    }

    /// Reads back a layout written by [`to_definition`](Self::to_definition).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the definition is not of kind
    /// [`MULTILEVEL_STORE_KIND`] or its tiers do not parse.
    pub fn from_definition(target: impl Into<String>, definition: &CacheDefinition) -> Result<Self> {
        let target = target.into();
        if !definition.is_layered() {
            return Err(Error::configuration(format!(
                "cache '{target}' is not a {MULTILEVEL_STORE_KIND} cache"
            )));
        }

        let tiers = definition
            .tier
            .options
            .get(TIERS_OPTION)
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        let tiers: Vec<TierConfig> = serde_json::from_value(tiers)
            .map_err(|e| Error::configuration(format!("cache '{target}' has malformed tiers: {e}")))?;

        Ok(Self {
            target,
            frontend: definition.frontend.clone(),
            tiers,
        })
    }
}

/// The host's named cache definitions.
///
/// Layering reads from this map and never consults process-wide state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheDefinitions(BTreeMap<String, CacheDefinition>);

impl CacheDefinitions {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, definition: CacheDefinition) -> Option<CacheDefinition> {
        self.0.insert(name.into(), definition)
    }

    /// Returns the definition named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CacheDefinition> {
        self.0.get(name)
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves `tiers` into the tier list of a multilevel cache named `target`.
    ///
    /// Named references take the store of the referenced definition as it is now,
    /// so the target may name itself to keep its current store as a tier. A tier
    /// whose policy sets `force_prefix_to_target_name` gets `target` as its key
    /// prefix and always cascades writes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `target` or a referenced name is not defined.
    pub fn layer<I>(&self, target: &str, tiers: I) -> Result<LayeredConfiguration>
    where
        I: IntoIterator<Item = TierReference>,
    {
        let definition = self
            .get(target)
            .ok_or_else(|| Error::configuration(format!("cannot layer undefined cache '{target}'")))?;

        let tiers = tiers
            .into_iter()
            .map(|reference| self.resolve(target, reference))
            .collect::<Result<Vec<_>>>()?;

        Ok(LayeredConfiguration {
            target: target.to_string(),
            frontend: definition.frontend.clone(),
            tiers,
        })
    }

    /// Writes a layered layout back under its target name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the layout cannot be encoded.
    pub fn apply_layered(&mut self, layered: &LayeredConfiguration) -> Result<()> {
        let definition = layered.to_definition()?;
        self.insert(layered.target.clone(), definition);
        Ok(())
    }

    fn resolve(&self, target: &str, reference: TierReference) -> Result<TierConfig> {
        let mut config = match reference {
            TierReference::Inline(config) => config,
            TierReference::Named(name) => self
                .get(&name)
                .map(|definition| definition.tier.clone())
                .ok_or_else(|| Error::configuration(format!("cache '{target}' references undefined cache '{name}'")))?,
        };

        if config.forces_prefix_to_target_name() {
            let policy = config.policy.get_or_insert_with(Default::default);
            policy.prefix = Some(target.to_string());
            policy.cascade_on_write = Some(true);
        }

        Ok(config)
    }
}

impl FromIterator<(String, CacheDefinition)> for CacheDefinitions {
    fn from_iter<I: IntoIterator<Item = (String, CacheDefinition)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
