// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A value as it is exchanged with a store.
///
/// Volatile stores keep values in their native in-memory form and exchange
/// [`Payload::Native`]. All other stores hold an opaque byte representation and
/// exchange [`Payload::Serialized`]; the engine owns encoding and decoding.
///
/// A stored payload is always a present value. Absence is expressed by the
/// surrounding `Option`, never by a sentinel payload.
///
/// # Examples
///
/// ```
/// use multilevel_store::Payload;
///
/// let native = Payload::Native(42);
/// assert_eq!(native.as_native(), Some(&42));
/// assert!(native.as_bytes().is_none());
///
/// let bytes: Payload<i32> = Payload::Serialized(b"42".to_vec());
/// assert_eq!(bytes.as_bytes(), Some(&b"42"[..]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload<V> {
    /// The value in its native form.
    Native(V),
    /// The value encoded to bytes.
    Serialized(Vec<u8>),
}

impl<V> Payload<V> {
    /// Returns `true` for a [`Payload::Native`] value.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    /// Returns the native value, if this payload holds one.
    #[must_use]
    pub fn as_native(&self) -> Option<&V> {
        match self {
            Self::Native(value) => Some(value),
            Self::Serialized(_) => None,
        }
    }

    /// Returns the encoded bytes, if this payload holds them.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Native(_) => None,
            Self::Serialized(bytes) => Some(bytes),
        }
    }

    /// Consumes the payload and returns the native value, if any.
    #[must_use]
    pub fn into_native(self) -> Option<V> {
        match self {
            Self::Native(value) => Some(value),
            Self::Serialized(_) => None,
        }
    }

    /// Consumes the payload and returns the encoded bytes, if any.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Native(_) => None,
            Self::Serialized(bytes) => Some(bytes),
        }
    }
}
