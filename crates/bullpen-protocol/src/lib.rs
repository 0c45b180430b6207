//! Wire protocol for Bullpen.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`Payload`], [`SystemMessage`], [`RoomCode`],
//!   [`Role`], [`DigitCount`], [`Recipient`]): framing, identities and
//!   event routing.
//! - **Game messages** ([`ClientRequest`], [`ServerEvent`], [`GameSnapshot`],
//!   [`GuessResult`], [`RelayMessage`]): what players ask for and what
//!   they are told.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room engine (ClientRequest)
//! ```

mod codec;
mod error;
mod game;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use game::{
    ClientRequest, CloseReason, DEFAULT_VOICE_MIME, GameSnapshot, GuessResult, RelayContent,
    RelayMessage, ServerEvent,
};
pub use types::{DigitCount, Envelope, Payload, Recipient, Role, RoomCode, SystemMessage};

/// The protocol version clients must send in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
