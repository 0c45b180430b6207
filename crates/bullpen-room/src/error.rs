//! Error types for the room layer.

use bullpen_protocol::{DigitCount, RoomCode};

/// Why an action on a room was rejected.
///
/// Every variant is a synchronous, caller-local rejection: the room is
/// left exactly as it was and nothing is broadcast. The server turns
/// these into `SystemMessage::Error` frames using [`RoomError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Room codes may not be empty or whitespace.
    #[error("invalid room code")]
    InvalidRoomCode,

    /// Another room already holds this code.
    #[error("room {0} already exists")]
    RoomExists(RoomCode),

    /// No room holds this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// Both slots are bound to live connections.
    #[error("room {0} is already full")]
    RoomFull(RoomCode),

    /// Only the host's current connection may do this.
    #[error("only the host can {0}")]
    NotHost(&'static str),

    /// Digit counts other than 3 or 4.
    #[error("invalid digit count {0}, expected 3 or 4")]
    InvalidDifficulty(i64),

    /// The digit count can't change once a secret has been submitted.
    #[error("difficulty can't change after a secret was submitted")]
    DifficultyLocked,

    /// The caller's connection is bound to neither slot.
    #[error("player not part of room {0}")]
    PlayerNotInRoom(RoomCode),

    /// Secrets are fixed while a game is running or finished.
    #[error("secrets can't change while a game is in progress")]
    GameInProgress,

    /// The caller's role doesn't hold the turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The opponent hasn't submitted a secret yet.
    #[error("opponent not ready")]
    OpponentNotReady,

    /// Restart needs both slots populated.
    #[error("both players are required to restart")]
    BothPlayersRequired,

    /// A secret that isn't exactly `digit_count` ASCII digits.
    #[error("secret must be exactly {0} digits")]
    InvalidSecret(DigitCount),

    /// A guess that isn't exactly `digit_count` ASCII digits.
    #[error("guess must be exactly {0} digits")]
    InvalidGuess(DigitCount),

    /// The room's actor stopped before it could answer.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// HTTP-style status code sent to the client with the message.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidRoomCode
            | Self::InvalidDifficulty(_)
            | Self::InvalidSecret(_)
            | Self::InvalidGuess(_) => 400,
            Self::NotHost(_) | Self::PlayerNotInRoom(_) => 403,
            Self::RoomNotFound(_) => 404,
            Self::RoomExists(_)
            | Self::RoomFull(_)
            | Self::DifficultyLocked
            | Self::GameInProgress
            | Self::NotYourTurn
            | Self::OpponentNotReady
            | Self::BothPlayersRequired => 409,
            Self::Unavailable(_) => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_messages_are_human_readable() {
        assert_eq!(
            RoomError::RoomExists(RoomCode::new("R1")).to_string(),
            "room R1 already exists"
        );
        assert_eq!(
            RoomError::NotHost("set the difficulty").to_string(),
            "only the host can set the difficulty"
        );
        assert_eq!(
            RoomError::InvalidGuess(DigitCount::DEFAULT).to_string(),
            "guess must be exactly 4 digits"
        );
    }

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::InvalidRoomCode.code(), 400);
        assert_eq!(RoomError::NotHost("restart the game").code(), 403);
        assert_eq!(RoomError::RoomNotFound(RoomCode::new("x")).code(), 404);
        assert_eq!(RoomError::NotYourTurn.code(), 409);
        assert_eq!(RoomError::Unavailable(RoomCode::new("x")).code(), 503);
    }
}
