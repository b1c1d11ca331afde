// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store operations.

/// An error from a store operation.
///
/// This is an opaque error type that can wrap any underlying error from a store
/// implementation. Use [`std::error::Error::source()`] to access the underlying
/// cause if needed.
///
/// # Example
///
/// ```
/// use multilevel_store::Error;
///
/// let error = Error::from_message("connection reset");
/// assert!(!error.is_unsupported());
/// ```
#[ohno::error]
pub struct Error {
    unsupported: bool,
}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// This is the public API for creating store errors from external crates.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(false, cause)
    }

    /// Creates an error reporting that the store lacks an optional capability.
    ///
    /// Returned by the default implementations of the optional [`CacheStore`](crate::CacheStore)
    /// methods.
    ///
    /// # Example
    ///
    /// ```
    /// use multilevel_store::Error;
    ///
    /// let error = Error::unsupported("flush_by_tag");
    /// assert!(error.is_unsupported());
    /// assert!(error.to_string().contains("flush_by_tag"));
    /// ```
    #[must_use]
    pub fn unsupported(capability: &str) -> Self {
        Self::caused_by(true, format!("store does not support {capability}"))
    }

    /// Returns `true` if this error was raised because a capability is missing.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }
}

/// A specialized [`Result`] type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
