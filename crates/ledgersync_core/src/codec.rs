//! CBOR encoding of payloads and mirror images.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CoreError::Encode`] if serialization fails.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// `field` names what is being decoded and ends up in the error.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] if the bytes are not a valid encoding of `T`.
pub fn from_cbor<T: DeserializeOwned>(field: &str, bytes: &[u8]) -> CoreResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::decode(field, e.to_string()))
}
