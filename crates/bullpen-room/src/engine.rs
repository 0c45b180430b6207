//! Routes decoded client requests to rooms.

use std::sync::Arc;

use bullpen_protocol::{ClientRequest, RelayContent};
use bullpen_transport::ConnectionId;

use crate::{BroadcastGateway, RoomConfig, RoomError, RoomStore};

/// The session engine: one entry point per client request.
///
/// Every request either succeeds, in which case its events have already
/// been handed to the gateway, or fails with a [`RoomError`] meant only
/// for the caller.
pub struct SessionEngine<B> {
    store: RoomStore<B>,
}

impl<B: BroadcastGateway> SessionEngine<B> {
    pub fn new(gateway: Arc<B>, config: RoomConfig) -> Self {
        Self {
            store: RoomStore::new(gateway, config),
        }
    }

    /// The room store behind this engine.
    pub fn store(&self) -> &RoomStore<B> {
        &self.store
    }

    /// Applies `request` on behalf of `caller`.
    pub async fn handle(
        &self,
        caller: ConnectionId,
        request: ClientRequest,
    ) -> Result<(), RoomError> {
        tracing::debug!(%caller, room = %request.room(), action = request.name(), "request");

        match request {
            ClientRequest::CreateRoom { room } => self.store.create(room, caller).await.map(|_| ()),
            ClientRequest::JoinRoom { room } => self.store.get(&room).await?.join(caller).await,
            ClientRequest::SetDifficulty { room, digit_count } => {
                self.store
                    .get(&room)
                    .await?
                    .set_difficulty(caller, digit_count)
                    .await
            }
            ClientRequest::SubmitSecret { room, secret } => {
                self.store.get(&room).await?.submit_secret(caller, secret).await
            }
            ClientRequest::MakeGuess { room, guess } => {
                self.store.get(&room).await?.make_guess(caller, guess).await
            }
            ClientRequest::RestartGame { room } => self.store.get(&room).await?.restart(caller).await,
            ClientRequest::SendChatMessage { room, message } => {
                self.store
                    .get(&room)
                    .await?
                    .relay(caller, RelayContent::Text { message })
                    .await
            }
            ClientRequest::SendVoiceMessage {
                room,
                audio,
                mime_type,
            } => {
                self.store
                    .get(&room)
                    .await?
                    .relay(caller, RelayContent::Voice { audio, mime_type })
                    .await
            }
            ClientRequest::CloseRoom { room } => self.store.close(&room, caller).await,
        }
    }
}
