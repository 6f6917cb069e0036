//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding protocol values.
///
/// The inner `serde_json::Error` is kept so the caller can see exactly
/// which field failed, while still only dealing with one error type
/// regardless of the codec in use.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (value → bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (bytes → value). Usually truncated or
    /// hand-edited data, or a snapshot written by an incompatible version.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
