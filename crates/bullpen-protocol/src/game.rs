//! Game-level messages: the actions clients request and the events the
//! server pushes back.
//!
//! Both enums are closed tagged unions. Requests are tagged by `action`,
//! events by `event`, so a client never compares free-form strings.

use serde::{Deserialize, Serialize};

use crate::{DigitCount, Role, RoomCode};

/// MIME type assumed for voice clips when the client doesn't name one.
pub const DEFAULT_VOICE_MIME: &str = "audio/webm";

fn default_voice_mime() -> String {
    DEFAULT_VOICE_MIME.to_string()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A game action sent by a client. The room code always comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ClientRequest {
    /// Open a new room under `room` with the caller as host.
    CreateRoom { room: RoomCode },

    /// Join as guest, or rebind a slot after a reconnect.
    JoinRoom { room: RoomCode },

    /// Host only: switch between 3- and 4-digit secrets.
    ///
    /// Carried as a plain integer so any out-of-range value, negative or
    /// huge, still decodes and is rejected by the room with an error.
    SetDifficulty { room: RoomCode, digit_count: i64 },

    /// Store the caller's hidden number.
    SubmitSecret { room: RoomCode, secret: String },

    /// Guess the opponent's number.
    MakeGuess { room: RoomCode, guess: String },

    /// Host only: clear secrets and histories and play again.
    RestartGame { room: RoomCode },

    /// Relay a text message to the opponent.
    SendChatMessage { room: RoomCode, message: String },

    /// Relay a recorded voice clip to the opponent. `audio` is the
    /// base64-encoded clip; the server passes it through untouched.
    SendVoiceMessage {
        room: RoomCode,
        audio: String,
        #[serde(default = "default_voice_mime")]
        mime_type: String,
    },

    /// Host only: dissolve the room and free its code.
    CloseRoom { room: RoomCode },
}

impl ClientRequest {
    /// The room this request targets.
    pub fn room(&self) -> &RoomCode {
        match self {
            Self::CreateRoom { room }
            | Self::JoinRoom { room }
            | Self::SetDifficulty { room, .. }
            | Self::SubmitSecret { room, .. }
            | Self::MakeGuess { room, .. }
            | Self::RestartGame { room }
            | Self::SendChatMessage { room, .. }
            | Self::SendVoiceMessage { room, .. }
            | Self::CloseRoom { room } => room,
        }
    }

    /// The action name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CreateRoom",
            Self::JoinRoom { .. } => "JoinRoom",
            Self::SetDifficulty { .. } => "SetDifficulty",
            Self::SubmitSecret { .. } => "SubmitSecret",
            Self::MakeGuess { .. } => "MakeGuess",
            Self::RestartGame { .. } => "RestartGame",
            Self::SendChatMessage { .. } => "SendChatMessage",
            Self::SendVoiceMessage { .. } => "SendVoiceMessage",
            Self::CloseRoom { .. } => "CloseRoom",
        }
    }
}

// ---------------------------------------------------------------------------
// Game data
// ---------------------------------------------------------------------------

/// One evaluated guess. Appended to the guesser's history and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResult {
    pub guess: String,
    pub bulls: u32,
    pub cows: u32,
}

/// A point-in-time view of a room, personalised to one recipient.
///
/// "Your" and "opponent" are relative to the recipient's role. The
/// recipient's own secret is included once submitted; the opponent's
/// only once the game is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub digit_count: DigitCount,
    pub current_turn: Role,
    pub is_game_started: bool,
    pub is_game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_secret: Option<String>,
    pub your_guesses: Vec<GuessResult>,
    pub opponent_guesses: Vec<GuessResult>,
}

/// What a relayed message carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RelayContent {
    Text { message: String },
    /// `audio` stays base64, exactly as the sender encoded it.
    Voice { audio: String, mime_type: String },
}

/// A chat or voice message passed from one player to the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub sender: Role,
    /// Unix time in milliseconds when the server accepted the message.
    pub timestamp: i64,
    pub content: RelayContent,
}

impl RelayMessage {
    /// Stamps `content` from `sender` with the current wall-clock time.
    pub fn now(sender: Role, content: RelayContent) -> Self {
        Self {
            sender,
            timestamp: chrono::Utc::now().timestamp_millis(),
            content,
        }
    }
}

/// Why a room went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The host sent `CloseRoom`.
    HostClosed,
    /// Nobody acted in the room for longer than the idle timeout.
    Idle,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A game event pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// To the creator: the room exists and this is your role.
    RoomCreated { role: Role },

    /// To the host: a guest took the second slot.
    OpponentJoined,

    /// A full personalised snapshot (after a join, and to each player
    /// individually when the game ends).
    GameState(GameSnapshot),

    /// To the guest: the host changed the difficulty.
    DifficultySet { digit_count: DigitCount },

    /// To both: both secrets are in, `turn` guesses first.
    GameStarted { turn: Role },

    /// To both: `role` guessed and got `result`. Never carries a secret.
    GuessResult { role: Role, result: GuessResult },

    /// To both: it is now `turn`'s move.
    TurnChanged { turn: Role },

    /// To both: the host restarted; back to secret submission.
    GameRestarted(GameSnapshot),

    /// To the other player: a relayed chat or voice message.
    Chat(RelayMessage),

    /// To everyone still subscribed: the room is gone.
    RoomClosed { reason: CloseReason },
}

impl ServerEvent {
    /// The event name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "RoomCreated",
            Self::OpponentJoined => "OpponentJoined",
            Self::GameState(_) => "GameState",
            Self::DifficultySet { .. } => "DifficultySet",
            Self::GameStarted { .. } => "GameStarted",
            Self::GuessResult { .. } => "GuessResult",
            Self::TurnChanged { .. } => "TurnChanged",
            Self::GameRestarted(_) => "GameRestarted",
            Self::Chat(_) => "Chat",
            Self::RoomClosed { .. } => "RoomClosed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            digit_count: DigitCount::DEFAULT,
            current_turn: Role::Player1,
            is_game_started: false,
            is_game_over: false,
            your_secret: None,
            opponent_secret: None,
            your_guesses: vec![],
            opponent_guesses: vec![],
        }
    }

    #[test]
    fn test_client_request_room_and_name() {
        let req = ClientRequest::SetDifficulty {
            room: RoomCode::new("R1"),
            digit_count: 3,
        };
        assert_eq!(req.room(), &RoomCode::new("R1"));
        assert_eq!(req.name(), "SetDifficulty");
    }

    #[test]
    fn test_set_difficulty_decodes_any_integer() {
        for n in [256_i64, -1, 1000, 5] {
            let raw = format!(r#"{{"action":"SetDifficulty","room":"R1","digit_count":{n}}}"#);
            let req: ClientRequest = serde_json::from_str(&raw).unwrap();
            assert_eq!(
                req,
                ClientRequest::SetDifficulty {
                    room: RoomCode::new("R1"),
                    digit_count: n,
                }
            );
        }
    }

    #[test]
    fn test_voice_relay_keeps_base64_string_on_the_wire() {
        let ev = ServerEvent::Chat(RelayMessage {
            sender: Role::Player2,
            timestamp: 0,
            content: RelayContent::Voice {
                audio: "UklGRg==".into(),
                mime_type: DEFAULT_VOICE_MIME.into(),
            },
        });
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["content"]["kind"], "Voice");
        assert_eq!(json["content"]["audio"], "UklGRg==");
    }

    #[test]
    fn test_server_event_name() {
        assert_eq!(ServerEvent::OpponentJoined.name(), "OpponentJoined");
        assert_eq!(
            ServerEvent::TurnChanged { turn: Role::Player2 }.name(),
            "TurnChanged"
        );
    }

    #[test]
    fn test_client_request_json_format() {
        let req = ClientRequest::SubmitSecret {
            room: RoomCode::new("R1"),
            secret: "1234".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "SubmitSecret");
        assert_eq!(json["room"], "R1");
        assert_eq!(json["secret"], "1234");
    }

    #[test]
    fn test_voice_request_defaults_mime_type() {
        let raw = r#"{"action":"SendVoiceMessage","room":"R1","audio":"AQID"}"#;
        let req: ClientRequest = serde_json::from_str(raw).unwrap();
        match req {
            ClientRequest::SendVoiceMessage { audio, mime_type, .. } => {
                assert_eq!(audio, "AQID");
                assert_eq!(mime_type, DEFAULT_VOICE_MIME);
            }
            other => panic!("expected SendVoiceMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_game_started_json_uses_role_wire_name() {
        let ev = ServerEvent::GameStarted { turn: Role::Player1 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "GameStarted");
        assert_eq!(json["turn"], "PLAYER1");
    }

    #[test]
    fn test_game_state_flattens_snapshot_fields() {
        let json = serde_json::to_value(ServerEvent::GameState(snapshot())).unwrap();
        assert_eq!(json["event"], "GameState");
        assert_eq!(json["digit_count"], 4);
        assert_eq!(json["is_game_started"], false);
        // Hidden secrets are omitted entirely, not sent as null.
        assert!(json.get("your_secret").is_none());
        assert!(json.get("opponent_secret").is_none());
    }

    #[test]
    fn test_game_state_reveals_secrets_when_present() {
        let mut snap = snapshot();
        snap.is_game_over = true;
        snap.your_secret = Some("1234".into());
        snap.opponent_secret = Some("5678".into());
        let json = serde_json::to_value(ServerEvent::GameState(snap.clone())).unwrap();
        assert_eq!(json["your_secret"], "1234");
        assert_eq!(json["opponent_secret"], "5678");

        let back: ServerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ServerEvent::GameState(snap));
    }

    #[test]
    fn test_guess_result_event_json_format() {
        let ev = ServerEvent::GuessResult {
            role: Role::Player2,
            result: GuessResult {
                guess: "1111".into(),
                bulls: 2,
                cows: 2,
            },
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["role"], "PLAYER2");
        assert_eq!(json["result"]["bulls"], 2);
        assert_eq!(json["result"]["cows"], 2);
    }

    #[test]
    fn test_chat_event_carries_sender_and_kind() {
        let ev = ServerEvent::Chat(RelayMessage {
            sender: Role::Player1,
            timestamp: 1_700_000_000_000,
            content: RelayContent::Text {
                message: "hi".into(),
            },
        });
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "Chat");
        assert_eq!(json["sender"], "PLAYER1");
        assert_eq!(json["content"]["kind"], "Text");
        assert_eq!(json["content"]["message"], "hi");
    }

    #[test]
    fn test_relay_message_now_stamps_current_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let msg = RelayMessage::now(
            Role::Player2,
            RelayContent::Text {
                message: "gg".into(),
            },
        );
        assert!(msg.timestamp >= before);
        assert_eq!(msg.sender, Role::Player2);
    }

    #[test]
    fn test_room_closed_json_format() {
        let json = serde_json::to_value(ServerEvent::RoomClosed {
            reason: CloseReason::Idle,
        })
        .unwrap();
        assert_eq!(json["event"], "RoomClosed");
        assert_eq!(json["reason"], "Idle");
    }
}
