//! The seam between rooms and whatever delivers their events.

use std::future::Future;

use bullpen_protocol::{RoomCode, ServerEvent};
use bullpen_transport::ConnectionId;

/// Delivers room events to connections and tracks room membership.
///
/// Rooms only know connection ids. The implementor owns the mapping from
/// a room code to the connections subscribed to it, and from a connection
/// id to its outbound queue. Delivery is best effort: an event addressed
/// to a connection that has gone away is dropped.
///
/// The server's connection registry is the production implementation.
pub trait BroadcastGateway: Send + Sync + 'static {
    /// Adds `conn` to `room`'s delivery group. Idempotent.
    fn subscribe(&self, room: &RoomCode, conn: ConnectionId) -> impl Future<Output = ()> + Send;

    /// Forgets `room`'s delivery group.
    fn dissolve(&self, room: &RoomCode) -> impl Future<Output = ()> + Send;

    /// Delivers `event` to one connection.
    fn send_to(&self, conn: ConnectionId, event: ServerEvent) -> impl Future<Output = ()> + Send;

    /// Delivers `event` to every connection subscribed to `room`, skipping
    /// `except` if given.
    fn broadcast(
        &self,
        room: &RoomCode,
        event: ServerEvent,
        except: Option<ConnectionId>,
    ) -> impl Future<Output = ()> + Send;

    /// Returns `true` while `conn` is still open.
    ///
    /// Rooms use this to decide whether a slot's stored connection may be
    /// taken over by a reconnecting player. A peer that vanishes without a
    /// close frame stays "open" until the server notices, which for the
    /// connection registry means its connection timeout. Until then a
    /// rejoin into that slot is refused with `RoomFull`.
    fn is_connected(&self, conn: ConnectionId) -> impl Future<Output = bool> + Send;
}
