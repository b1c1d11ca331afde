// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, sync::Arc};

/// Handle to the logical cache a store serves.
///
/// The multilevel engine receives one `Frontend` for the logical cache and forwards
/// the same handle to every tier, so all tiers operate against one cache identity.
/// Stores that share a physical backend between several logical caches can use
/// [`identifier`](Self::identifier) to namespace their entries.
///
/// Cloning is cheap.
///
/// # Examples
///
/// ```
/// use multilevel_store::Frontend;
///
/// let frontend = Frontend::new("pages");
/// assert_eq!(frontend.identifier(), "pages");
/// assert_eq!(frontend.clone(), frontend);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frontend {
    identifier: Arc<str>,
}

impl Frontend {
    /// Creates a handle for the logical cache with the given identifier.
    pub fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    /// Returns the identifier of the logical cache.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}
