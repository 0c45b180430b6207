//! # Bullpen
//!
//! A two-player bulls-and-cows game server.
//!
//! A host opens a room under a short code, a guest joins it, each picks a
//! hidden 3- or 4-digit number, and they take turns guessing. Every guess
//! is scored in bulls (right digit, right place) and cows (right digit,
//! wrong place). Players can also pass chat and voice messages.
//!
//! The server speaks JSON envelopes over WebSockets:
//!
//! ```text
//! WebSocketTransport → handler (Envelope) → SessionEngine → room actor
//!                                                              │
//!       writer task ← ConnectionRegistry (BroadcastGateway) ←──┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bullpen::prelude::*;
//!
//! # async fn start() -> Result<(), BullpenError> {
//! let server = BullpenServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod registry;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::BullpenError;
pub use registry::ConnectionRegistry;
pub use server::{BullpenServer, ServerBuilder};

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{BullpenError, BullpenServer, ConfigError, ServerBuilder, ServerConfig};
    pub use bullpen_protocol::{
        ClientRequest, CloseReason, Codec, DigitCount, Envelope, GameSnapshot, GuessResult,
        JsonCodec, PROTOCOL_VERSION, Payload, RelayContent, RelayMessage, Role, RoomCode,
        ServerEvent, SystemMessage,
    };
    pub use bullpen_room::{RoomConfig, RoomError, RoomPhase};
}
