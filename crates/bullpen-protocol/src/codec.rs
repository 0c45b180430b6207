//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the raw bytes a [`Connection`]
//! moves. The server only depends on the [`Codec`] trait, so swapping the
//! wire format does not touch the engine or the handler.
//!
//! [`Connection`]: bullpen_transport::Connection

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `DeserializeOwned` means decoded values own their data, so the input
/// buffer can be dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients can build and inspect frames without extra tooling.
///
/// ```rust
/// use bullpen_protocol::{Codec, Envelope, JsonCodec, Payload, SystemMessage};
///
/// let codec = JsonCodec;
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     payload: Payload::System(SystemMessage::Heartbeat { client_time: 5000 }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
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

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientRequest, Envelope, Payload, RoomCode};

    #[test]
    fn test_json_codec_decodes_request_envelope_from_client_json() {
        // Exactly what a browser client would put on the wire.
        let raw = br#"{
            "seq": 3,
            "timestamp": 0,
            "payload": {
                "type": "Request",
                "data": { "action": "MakeGuess", "room": "R1", "guess": "1234" }
            }
        }"#;

        let env: Envelope = JsonCodec.decode(raw).unwrap();
        assert_eq!(env.seq, 3);
        assert_eq!(
            env.payload,
            Payload::Request(ClientRequest::MakeGuess {
                room: RoomCode::new("R1"),
                guess: "1234".into(),
            })
        );
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_unknown_action_returns_error() {
        let raw = br#"{"seq":1,"timestamp":0,"payload":{"type":"Request","data":{"action":"Teleport","room":"R1"}}}"#;
        let result: Result<Envelope, _> = JsonCodec.decode(raw);
        assert!(result.is_err());
    }
}
