//! Rooms and turn-based games for Bullpen.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! game state for one pair of players. Actions on a room are serialized
//! through its mailbox; different rooms run independently.
//!
//! # Key types
//!
//! - [`SessionEngine`]: routes client requests to rooms
//! - [`RoomStore`]: creates, finds, closes and reaps rooms
//! - [`RoomHandle`]: send actions to a running room actor
//! - [`Room`]: the game state machine an actor owns
//! - [`BroadcastGateway`]: the trait the server implements to deliver events
//! - [`evaluate`]: bulls-and-cows scoring

mod config;
mod engine;
mod error;
mod evaluator;
mod gateway;
mod room;
mod session;
mod store;

pub use config::{RoomConfig, RoomPhase};
pub use engine::SessionEngine;
pub use error::RoomError;
pub use evaluator::evaluate;
pub use gateway::BroadcastGateway;
pub use room::{RoomHandle, RoomInfo};
pub use session::{JoinOutcome, Outbound, Room};
pub use store::RoomStore;
