// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types surfaced by the multilevel cache.

use std::fmt;

/// The category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A tier configuration could not be resolved into a store, or store setup failed.
    ///
    /// The cache keeps its previous tier list.
    Configuration,
    /// A cache operation was invoked before the first successful `configure`.
    NotConfigured,
    /// One or more tiers failed a write, remove, flush or garbage collection.
    ///
    /// Every eligible tier was still attempted. The individual failures are
    /// available through [`Error::tier_failures`].
    TierOperation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "invalid cache configuration",
            Self::NotConfigured => "cache is not configured",
            Self::TierOperation => "tier operation failed",
        })
    }
}

/// A failure reported by a single tier.
#[derive(Debug)]
pub struct TierFailure {
    tier: usize,
    operation: &'static str,
    error: multilevel_store::Error,
}

impl TierFailure {
    pub(crate) fn new(tier: usize, operation: &'static str, error: multilevel_store::Error) -> Self {
        Self { tier, operation, error }
    }

    /// Position of the failing tier, counted from the fastest tier at zero.
    #[must_use]
    pub fn tier(&self) -> usize {
        self.tier
    }

    /// Name of the store operation that failed, such as `set` or `flush_by_tag`.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The error reported by the store.
    #[must_use]
    pub fn error(&self) -> &multilevel_store::Error {
        &self.error
    }
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} failed {}: {}", self.tier, self.operation, self.error)
    }
}

/// An error from a multilevel cache operation.
///
/// Use [`kind`](Self::kind) to tell configuration problems apart from tier
/// failures. Failures aggregated across tiers are listed by
/// [`tier_failures`](Self::tier_failures).
///
/// # Examples
///
/// ```
/// use multilevel::{ErrorKind, TieredCache};
///
/// let cache = TieredCache::<String>::new("pages");
/// let error = cache.get("key").unwrap_err();
/// assert_eq!(error.kind(), ErrorKind::NotConfigured);
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
    failures: Vec<TierFailure>,
}

impl Error {
    pub(crate) fn configuration(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Configuration, Vec::<TierFailure>::new(), cause)
    }

    pub(crate) fn not_configured(cache_name: &str) -> Self {
        Self::caused_by(
            ErrorKind::NotConfigured,
            Vec::<TierFailure>::new(),
            format!("cache '{cache_name}' has no tiers yet"),
        )
    }

    pub(crate) fn tier_operation(failures: Vec<TierFailure>) -> Self {
        let summary = failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        Self::caused_by(ErrorKind::TierOperation, failures, summary)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` for [`ErrorKind::Configuration`].
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }

    /// Returns `true` for [`ErrorKind::NotConfigured`].
    #[must_use]
    pub fn is_not_configured(&self) -> bool {
        self.kind == ErrorKind::NotConfigured
    }

    /// Returns the individual tier failures behind an [`ErrorKind::TierOperation`] error.
    ///
    /// Empty for every other kind.
    #[must_use]
    pub fn tier_failures(&self) -> &[TierFailure] {
        &self.failures
    }
}

/// A specialized [`Result`] type for multilevel cache operations.
pub type Result<T> = std::result::Result<T, Error>;
