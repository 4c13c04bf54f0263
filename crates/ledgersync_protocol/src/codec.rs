//! CBOR framing of wire messages.

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A message that travels to or from the remote authority as CBOR.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Name used in codec errors.
    const NAME: &'static str;

    /// Encodes to CBOR bytes.
    fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| ProtocolError::Encode {
            message: Self::NAME,
            reason: e.to_string(),
        })?;
        Ok(buf)
    }

    /// Decodes from CBOR bytes.
    fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decode {
            message: Self::NAME,
            reason: e.to_string(),
        })
    }
}
