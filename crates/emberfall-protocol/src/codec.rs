//! Codec trait and implementations for turning protocol values into bytes.
//!
//! The engine never cares which format sits underneath: the session
//! repository stores snapshots through a [`Codec`], and gateways that push
//! events over a socket encode them with one. [`JsonCodec`] is the only
//! implementation today; a binary codec can slot in behind the same trait.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because codecs live inside long-running actor
/// tasks and are shared between them.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable, which makes stored snapshots and event streams easy to
/// inspect. Behind the `json` feature (on by default).
///
/// ```rust
/// use emberfall_protocol::{Codec, CombatEvent, EndReason, JsonCodec, SessionId};
///
/// let codec = JsonCodec;
/// let event = CombatEvent::CombatEnded {
///     session_id: SessionId(7),
///     reason: EndReason::Timeout,
///     victors: vec![],
///     defeated: vec![],
/// };
///
/// let bytes = codec.encode(&event).unwrap();
/// let decoded: CombatEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
