//! Core protocol types: identities, routing, and the envelope every frame
//! travels in.
//!
//! Everything here that derives `Serialize`/`Deserialize` is part of the
//! wire format the browser client speaks, so the JSON shapes are pinned
//! by the tests at the bottom of this file.

use std::fmt;

use bullpen_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::{ClientRequest, ServerEvent};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The caller-chosen code that names a room.
///
/// Codes are compared exactly (case-sensitive) and never change once a
/// room is created. `#[serde(transparent)]` puts the bare string on the
/// wire rather than `{ "0": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a raw code. No validation happens here; creating a room
    /// rejects blank codes.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns `true` if the code is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two fixed participant slots in a room.
///
/// The host who created the room is always `Player1`; the guest who
/// joined is `Player2`. A role belongs to the slot, not to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "PLAYER1")]
    Player1,
    #[serde(rename = "PLAYER2")]
    Player2,
}

impl Role {
    /// Both roles, host first.
    pub const ALL: [Role; 2] = [Role::Player1, Role::Player2];

    /// Returns the other role.
    pub fn opponent(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }

    /// Index into per-role arrays: 0 for the host, 1 for the guest.
    pub fn index(self) -> usize {
        match self {
            Self::Player1 => 0,
            Self::Player2 => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player1 => f.write_str("PLAYER1"),
            Self::Player2 => f.write_str("PLAYER2"),
        }
    }
}

/// How many digits a secret has in a room. Always 3 or 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DigitCount(u8);

impl DigitCount {
    /// The count a freshly created room starts with.
    pub const DEFAULT: DigitCount = DigitCount(4);

    /// Returns `Some` only for the supported counts, 3 and 4.
    pub fn new(count: u8) -> Option<Self> {
        matches!(count, 3 | 4).then_some(Self(count))
    }

    /// The count as a plain number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// The count as a string width, for comparing against lengths.
    pub fn width(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for DigitCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for DigitCount {
    type Error = String;

    fn try_from(count: u8) -> Result<Self, Self::Error> {
        Self::new(count).ok_or_else(|| format!("digit count must be 3 or 4, got {count}"))
    }
}

impl From<DigitCount> for u8 {
    fn from(count: DigitCount) -> Self {
        count.0
    }
}

impl fmt::Display for DigitCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Where the engine wants an event delivered.
///
/// The room logic pairs every event it emits with one of these; the
/// broadcast gateway turns them into concrete connections. The caller of
/// an action is addressed as `Connection(caller)`, everyone else in the
/// room as `AllExcept(caller)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection subscribed to the room, caller included.
    All,

    /// Exactly one connection.
    Connection(ConnectionId),

    /// Every connection subscribed to the room except this one.
    AllExcept(ConnectionId),
}

// ---------------------------------------------------------------------------
// SystemMessage: connection-level plumbing
// ---------------------------------------------------------------------------

/// Messages about the connection itself rather than the game.
///
/// `#[serde(tag = "type")]` makes these internally tagged:
/// `{ "type": "Heartbeat", "client_time": 5 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: first frame on every connection.
    Handshake { version: u32 },

    /// Server → Client: handshake accepted. `connection_id` is the
    /// client's connection handle for the lifetime of this socket.
    HandshakeAck { connection_id: u64, server_time: u64 },

    /// Either direction: "I'm disconnecting."
    Disconnect { reason: String },

    /// Client → Server: keep-alive. Resets the server's idle timer.
    Heartbeat { client_time: u64 },

    /// Server → Client: heartbeat echo for round-trip measurement.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Server → Client: the request was rejected. Only the caller ever
    /// sees this. `code` follows HTTP conventions (400, 403, 404, 409...).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of a frame.
///
/// Adjacently tagged, so a guess looks like
/// `{ "type": "Request", "data": { "action": "MakeGuess", ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Connection plumbing (handshake, heartbeat, errors).
    System(SystemMessage),

    /// Client → Server: a game action.
    Request(ClientRequest),

    /// Server → Client: a game event.
    Event(ServerEvent),
}

/// The top-level wire format. Every frame is one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number. The server numbers its frames per
    /// connection, starting at 0 for the handshake ack.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,

    /// The frame's content.
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::new("R1")).unwrap();
        assert_eq!(json, "\"R1\"");
    }

    #[test]
    fn test_room_code_is_blank() {
        assert!(RoomCode::new("").is_blank());
        assert!(RoomCode::new("  \t").is_blank());
        assert!(!RoomCode::new(" a ").is_blank());
    }

    #[test]
    fn test_room_code_is_case_sensitive() {
        assert_ne!(RoomCode::new("abc"), RoomCode::new("ABC"));
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Player1).unwrap(), "\"PLAYER1\"");
        assert_eq!(serde_json::to_string(&Role::Player2).unwrap(), "\"PLAYER2\"");
        let role: Role = serde_json::from_str("\"PLAYER2\"").unwrap();
        assert_eq!(role, Role::Player2);
    }

    #[test]
    fn test_role_opponent_and_index() {
        assert_eq!(Role::Player1.opponent(), Role::Player2);
        assert_eq!(Role::Player2.opponent(), Role::Player1);
        assert_eq!(Role::Player1.index(), 0);
        assert_eq!(Role::Player2.index(), 1);
    }

    #[test]
    fn test_digit_count_accepts_only_three_and_four() {
        assert!(DigitCount::new(2).is_none());
        assert_eq!(DigitCount::new(3).map(DigitCount::get), Some(3));
        assert_eq!(DigitCount::new(4).map(DigitCount::get), Some(4));
        assert!(DigitCount::new(5).is_none());
        assert_eq!(DigitCount::default().get(), 4);
    }

    #[test]
    fn test_digit_count_rejects_out_of_range_on_decode() {
        assert!(serde_json::from_str::<DigitCount>("7").is_err());
        let count: DigitCount = serde_json::from_str("3").unwrap();
        assert_eq!(count.width(), 3);
    }

    #[test]
    fn test_system_message_error_json_format() {
        let msg = SystemMessage::Error {
            code: 409,
            message: "room R1 already exists".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
    }

    #[test]
    fn test_payload_system_json_format() {
        let payload = Payload::System(SystemMessage::Handshake { version: 1 });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "System");
        assert_eq!(json["data"]["type"], "Handshake");
        assert_eq!(json["data"]["version"], 1);
    }

    #[test]
    fn test_envelope_decodes_handshake_ack() {
        let raw = r#"{"seq":0,"timestamp":0,"payload":{"type":"System","data":{"type":"HandshakeAck","connection_id":9,"server_time":0}}}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(
            env.payload,
            Payload::System(SystemMessage::HandshakeAck {
                connection_id: 9,
                server_time: 0,
            })
        );
    }

    #[test]
    fn test_envelope_missing_payload_is_rejected() {
        assert!(serde_json::from_str::<Envelope>(r#"{"seq":1,"timestamp":0}"#).is_err());
    }
}
