//! Connection registry: the server's [`BroadcastGateway`].
//!
//! Each live connection owns an unbounded outbound queue drained by its
//! writer task. Rooms address connections by id and rooms by code; the
//! registry resolves both to queues.

use std::collections::{HashMap, HashSet};

use bullpen_protocol::{Payload, RoomCode, ServerEvent};
use bullpen_room::BroadcastGateway;
use bullpen_transport::ConnectionId;
use tokio::sync::{RwLock, mpsc};

/// Channel sender for delivering payloads to a connection's writer task.
type OutboundSender = mpsc::UnboundedSender<Payload>;

/// Tracks live connections and which rooms they are subscribed to.
#[derive(Default)]
pub struct ConnectionRegistry {
    outbound: RwLock<HashMap<ConnectionId, OutboundSender>>,
    groups: RwLock<HashMap<RoomCode, HashSet<ConnectionId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiving end of its queue.
    pub async fn register(&self, conn: ConnectionId) -> mpsc::UnboundedReceiver<Payload> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound.write().await.insert(conn, tx);
        rx
    }

    /// Forgets a connection: drops its queue (ending its writer task once
    /// drained) and removes it from every room group.
    pub async fn unregister(&self, conn: ConnectionId) {
        if self.outbound.write().await.remove(&conn).is_none() {
            return;
        }
        let mut groups = self.groups.write().await;
        for members in groups.values_mut() {
            members.remove(&conn);
        }
        groups.retain(|_, members| !members.is_empty());
    }

    /// Queues a payload for one connection. Returns `false` if the
    /// connection is gone.
    pub async fn send_payload(&self, conn: ConnectionId, payload: Payload) -> bool {
        match self.outbound.read().await.get(&conn) {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.outbound.read().await.len()
    }

    /// Connections subscribed to `room`, sorted.
    pub async fn members(&self, room: &RoomCode) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .groups
            .read()
            .await
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

impl BroadcastGateway for ConnectionRegistry {
    async fn subscribe(&self, room: &RoomCode, conn: ConnectionId) {
        self.groups
            .write()
            .await
            .entry(room.clone())
            .or_default()
            .insert(conn);
    }

    async fn dissolve(&self, room: &RoomCode) {
        self.groups.write().await.remove(room);
    }

    async fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        let name = event.name();
        if !self.send_payload(conn, Payload::Event(event)).await {
            tracing::warn!(%conn, event = name, "dropping event for unknown connection");
        }
    }

    async fn broadcast(&self, room: &RoomCode, event: ServerEvent, except: Option<ConnectionId>) {
        let members = self.members(room).await;
        let outbound = self.outbound.read().await;
        for conn in members.into_iter().filter(|c| Some(*c) != except) {
            match outbound.get(&conn) {
                Some(tx) => {
                    let _ = tx.send(Payload::Event(event.clone()));
                }
                None => tracing::warn!(
                    %conn,
                    %room,
                    event = event.name(),
                    "dropping event for unknown connection"
                ),
            }
        }
    }

    /// Registered and its writer still running. A silently dropped peer
    /// counts as connected until the handler's recv timeout unregisters it.
    async fn is_connected(&self, conn: ConnectionId) -> bool {
        self.outbound
            .read()
            .await
            .get(&conn)
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullpen_protocol::{CloseReason, Role};

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn created() -> ServerEvent {
        ServerEvent::RoomCreated {
            role: Role::Player1,
        }
    }

    #[tokio::test]
    async fn test_send_to_reaches_only_target() {
        let registry = ConnectionRegistry::new();
        let mut a = registry.register(conn(1)).await;
        let mut b = registry.register(conn(2)).await;

        registry.send_to(conn(1), created()).await;

        assert_eq!(a.recv().await, Some(Payload::Event(created())));
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_respects_group_and_exclusion() {
        let registry = ConnectionRegistry::new();
        let mut a = registry.register(conn(1)).await;
        let mut b = registry.register(conn(2)).await;
        let mut outsider = registry.register(conn(3)).await;
        let room = RoomCode::new("R1");
        registry.subscribe(&room, conn(1)).await;
        registry.subscribe(&room, conn(2)).await;

        registry
            .broadcast(&room, ServerEvent::OpponentJoined, Some(conn(2)))
            .await;
        assert_eq!(a.recv().await, Some(Payload::Event(ServerEvent::OpponentJoined)));
        assert!(b.try_recv().is_err());

        let closed = ServerEvent::RoomClosed {
            reason: CloseReason::HostClosed,
        };
        registry.broadcast(&room, closed.clone(), None).await;
        assert_eq!(a.recv().await, Some(Payload::Event(closed.clone())));
        assert_eq!(b.recv().await, Some(Payload::Event(closed)));
        assert!(outsider.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_leaves_groups_and_ends_queue() {
        let registry = ConnectionRegistry::new();
        let mut a = registry.register(conn(1)).await;
        let _b = registry.register(conn(2)).await;
        let room = RoomCode::new("R1");
        registry.subscribe(&room, conn(1)).await;
        registry.subscribe(&room, conn(2)).await;
        assert!(registry.is_connected(conn(1)).await);

        registry.unregister(conn(1)).await;

        assert!(!registry.is_connected(conn(1)).await);
        assert_eq!(registry.members(&room).await, vec![conn(2)]);
        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(a.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_not_connected() {
        let registry = ConnectionRegistry::new();
        let rx = registry.register(conn(1)).await;
        drop(rx);
        assert!(!registry.is_connected(conn(1)).await);
        assert!(!registry.send_payload(conn(1), Payload::Event(created())).await);
    }

    #[tokio::test]
    async fn test_dissolve_forgets_group() {
        let registry = ConnectionRegistry::new();
        let mut a = registry.register(conn(1)).await;
        let room = RoomCode::new("R1");
        registry.subscribe(&room, conn(1)).await;
        registry.dissolve(&room).await;

        registry.broadcast(&room, ServerEvent::OpponentJoined, None).await;
        assert!(registry.members(&room).await.is_empty());
        assert!(a.try_recv().is_err());
    }
}
