// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging for cache operations.
//!
//! With the `logs` feature enabled, the engine reports hits, misses, promotions,
//! reconfigurations and tier failures as `tracing` events. Without it, recording
//! compiles down to nothing.

use std::fmt;

#[cfg(all(test, feature = "logs"))]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheOperation {
    Configure,
    Get,
    Set,
    Has,
    Remove,
    Flush,
    FlushByTag,
    FindIdentifiersByTag,
    CollectGarbage,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "cache.configure",
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Has => "cache.has",
            Self::Remove => "cache.remove",
            Self::Flush => "cache.flush",
            Self::FlushByTag => "cache.flush_by_tag",
            Self::FindIdentifiersByTag => "cache.find_identifiers_by_tag",
            Self::CollectGarbage => "cache.collect_garbage",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Promoted,
    PromotionFailed,
    /// A tier failed a lookup and was treated as not holding the key.
    TierFailed,
    /// A tier without tag support was flushed in full.
    TagFallback,
    Configured,
    Ok,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Promoted => "cache.promoted",
            Self::PromotionFailed => "cache.promotion_failed",
            Self::TierFailed => "cache.tier_failed",
            Self::TagFallback => "cache.tag_fallback",
            Self::Configured => "cache.configured",
            Self::Ok => "cache.ok",
            Self::Error => "cache.error",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Ok => Severity::Debug,
            Self::Promoted | Self::TagFallback | Self::Configured => Severity::Info,
            Self::PromotionFailed | Self::TierFailed => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Emits cache events for one cache instance.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CacheTelemetry {
    logging_enabled: bool,
}

impl Default for CacheTelemetry {
    fn default() -> Self {
        Self::new(cfg!(feature = "logs"))
    }
}

impl CacheTelemetry {
    #[must_use]
    pub fn new(logging_enabled: bool) -> Self {
        Self { logging_enabled }
    }

    /// Records a cache event.
    ///
    /// `tier` is `None` for events about the cache as a whole.
    #[inline]
    pub fn record(
        self,
        cache_name: &str,
        tier: Option<usize>,
        operation: CacheOperation,
        activity: CacheActivity,
        detail: Option<&dyn fmt::Display>,
    ) {
        #[cfg(feature = "logs")]
        {
            if self.logging_enabled {
                Self::emit(cache_name, tier, operation, activity, detail);
            }
        }

        #[cfg(not(feature = "logs"))]
        {
            let _ = (self, cache_name, tier, operation, activity, detail);
        }
    }

    #[cfg(feature = "logs")]
    fn emit(cache_name: &str, tier: Option<usize>, operation: CacheOperation, activity: CacheActivity, detail: Option<&dyn fmt::Display>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let detail = detail.map(ToString::to_string);

        // Tracing levels must be constant, hence one macro arm per level.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.tier = tier,
                    cache.operation = op,
                    cache.activity = act,
                    cache.detail = detail.as_deref(),
                    "cache.event"
                )
            };
        }

        match activity.severity() {
            Severity::Debug => emit_event!(debug),
            Severity::Info => emit_event!(info),
            Severity::Warn => emit_event!(warn),
            Severity::Error => emit_event!(error),
        }
    }
}
