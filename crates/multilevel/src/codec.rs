// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Value encoding for tiers that do not hold native values.

use multilevel_store::{Error, Payload};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes `value` as JSON bytes.
pub(crate) fn encode<V: Serialize>(value: &V) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(Error::from_message)
}

/// Turns a payload read from any tier back into a value.
pub(crate) fn decode<V: DeserializeOwned>(payload: Payload<V>) -> Result<V, Error> {
    match payload {
        Payload::Native(value) => Ok(value),
        Payload::Serialized(bytes) => serde_json::from_slice(&bytes).map_err(Error::from_message),
    }
}
