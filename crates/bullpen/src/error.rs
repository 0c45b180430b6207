//! Unified error type for the Bullpen server.

use bullpen_protocol::ProtocolError;
use bullpen_room::RoomError;
use bullpen_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BullpenError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, wrong turn...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Invalid server configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
