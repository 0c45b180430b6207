//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, unknown
    /// action names, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A frame exceeded the configured size limit and was not decoded.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    /// The frame decoded but breaks protocol rules, e.g. anything other
    /// than a handshake as the first frame, or a version mismatch.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
