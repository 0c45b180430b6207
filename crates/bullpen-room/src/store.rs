//! Room store: the process-wide directory of live rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bullpen_protocol::RoomCode;
use bullpen_transport::ConnectionId;
use tokio::sync::RwLock;

use crate::room::spawn_room;
use crate::{BroadcastGateway, RoomConfig, RoomError, RoomHandle};

/// Maps room codes to running room actors.
///
/// Lookups take a read lock and clone the handle out, so the lock is never
/// held while a room works. Creation and removal take the write lock.
pub struct RoomStore<B> {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    gateway: Arc<B>,
    config: RoomConfig,
}

impl<B: BroadcastGateway> RoomStore<B> {
    /// Creates an empty store whose rooms deliver through `gateway`.
    pub fn new(gateway: Arc<B>, config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room under `code` with `host` as `Player1`.
    ///
    /// The existence check and the insert happen under one write lock, so
    /// of several concurrent creates for the same code exactly one wins.
    pub async fn create(
        &self,
        code: RoomCode,
        host: ConnectionId,
    ) -> Result<RoomHandle, RoomError> {
        if code.is_blank() {
            return Err(RoomError::InvalidRoomCode);
        }

        let mut rooms = self.rooms.write().await;
        if let Some(existing) = rooms.get(&code) {
            if !existing.is_closed() {
                return Err(RoomError::RoomExists(code));
            }
            tracing::warn!(room = %code, "replacing room whose actor stopped");
        }

        let handle = spawn_room(code.clone(), host, Arc::clone(&self.gateway), &self.config).await;
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, %host, rooms = rooms.len(), "room created");

        Ok(handle)
    }

    /// Looks up a live room.
    pub async fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .await
            .get(code)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    /// Host only: closes the room, notifies its members and frees the code.
    pub async fn close(&self, code: &RoomCode, caller: ConnectionId) -> Result<(), RoomError> {
        let handle = self.get(code).await?;
        handle.close(caller).await?;
        self.remove_exact(std::slice::from_ref(&handle)).await;
        Ok(())
    }

    /// Closes every room that accepted no action for at least `max_idle`.
    ///
    /// Each room decides for itself under its own mailbox, so a room that
    /// becomes active while the sweep runs is left alone. Rooms whose actor
    /// has stopped are dropped too. Returns the codes that were removed.
    pub async fn reap_idle(&self, max_idle: Duration) -> Vec<RoomCode> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for handle in handles {
            match handle.expire(max_idle).await {
                Ok(false) => {}
                Ok(true) | Err(_) => expired.push(handle),
            }
        }

        if !expired.is_empty() {
            let remaining = self.remove_exact(&expired).await;
            tracing::info!(reaped = expired.len(), rooms = remaining, "reaped idle rooms");
        }

        expired.into_iter().map(|h| h.code().clone()).collect()
    }

    /// Removes each handle's entry unless its code was reused by a newer
    /// room in the meantime. Returns how many rooms are left.
    async fn remove_exact(&self, handles: &[RoomHandle]) -> usize {
        let mut rooms = self.rooms.write().await;
        for handle in handles {
            if rooms
                .get(handle.code())
                .is_some_and(|current| current.same_room(handle))
            {
                rooms.remove(handle.code());
            }
        }
        rooms.len()
    }

    /// Number of rooms in the store.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Codes of every room in the store, sorted.
    pub async fn codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.rooms.read().await.keys().cloned().collect();
        codes.sort();
        codes
    }
}
