//! Room configuration and the game phase state machine.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room in a [`RoomStore`](crate::RoomStore).
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Close rooms in which no action was accepted for this long.
    ///
    /// `None` keeps every room for the life of the process.
    pub idle_timeout: Option<Duration>,

    /// Capacity of each room actor's mailbox. Senders wait when it is full.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its game lifecycle.
///
/// Derived from the room's fields, never stored:
///
/// ```text
/// AwaitingGuest → AwaitingSecrets → InProgress → GameOver
///                        ↑                          │
///                        └──────── restart ─────────┘
/// ```
///
/// Restart returns to `AwaitingSecrets`, not `AwaitingGuest`: both slots
/// stay populated. The host may also restart a game still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    AwaitingGuest,
    AwaitingSecrets,
    InProgress,
    GameOver,
}

impl RoomPhase {
    /// Returns `true` if a new guest could still take the second slot.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::AwaitingGuest)
    }

    /// Returns `true` if the lifecycle allows moving straight to `target`.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::AwaitingGuest, Self::AwaitingSecrets)
                | (Self::AwaitingSecrets, Self::InProgress)
                | (Self::InProgress, Self::GameOver)
                | (Self::InProgress, Self::AwaitingSecrets)
                | (Self::GameOver, Self::AwaitingSecrets)
        )
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingGuest => write!(f, "AwaitingGuest"),
            Self::AwaitingSecrets => write!(f, "AwaitingSecrets"),
            Self::InProgress => write!(f, "InProgress"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_phase_transitions() {
        assert!(RoomPhase::AwaitingGuest.can_transition_to(RoomPhase::AwaitingSecrets));
        assert!(RoomPhase::AwaitingSecrets.can_transition_to(RoomPhase::InProgress));
        assert!(RoomPhase::InProgress.can_transition_to(RoomPhase::GameOver));
        assert!(RoomPhase::GameOver.can_transition_to(RoomPhase::AwaitingSecrets));
        assert!(RoomPhase::InProgress.can_transition_to(RoomPhase::AwaitingSecrets));

        assert!(!RoomPhase::GameOver.can_transition_to(RoomPhase::AwaitingGuest));
        assert!(!RoomPhase::AwaitingGuest.can_transition_to(RoomPhase::InProgress));
        assert!(!RoomPhase::GameOver.can_transition_to(RoomPhase::InProgress));
    }

    #[test]
    fn test_room_phase_only_awaiting_guest_is_joinable() {
        assert!(RoomPhase::AwaitingGuest.is_joinable());
        assert!(!RoomPhase::AwaitingSecrets.is_joinable());
        assert!(!RoomPhase::GameOver.is_joinable());
    }

    #[test]
    fn test_room_phase_display() {
        assert_eq!(RoomPhase::AwaitingSecrets.to_string(), "AwaitingSecrets");
        assert_eq!(RoomPhase::GameOver.to_string(), "GameOver");
    }

    #[test]
    fn test_room_config_default_never_expires() {
        let config = RoomConfig::default();
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.command_buffer, 64);
    }
}
