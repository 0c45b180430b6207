//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every action on a room goes through its mailbox and is handled to
//! completion, events included, before the next one is read. Two players
//! racing on the same room are therefore serialized, while different rooms
//! never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use bullpen_protocol::{
    CloseReason, DigitCount, Recipient, RelayContent, Role, RoomCode, ServerEvent,
};
use bullpen_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::session::{Outbound, Room};
use crate::{BroadcastGateway, RoomConfig, RoomError, RoomPhase};

/// A player action, addressed to a room by its handle.
#[derive(Debug)]
pub(crate) enum RoomAction {
    Join,
    SetDifficulty(i64),
    SubmitSecret(String),
    MakeGuess(String),
    Restart,
    Relay(RelayContent),
    Close,
}

impl RoomAction {
    fn kind(&self) -> ActionKind {
        match self {
            Self::Join => ActionKind::Join,
            Self::SetDifficulty(_) => ActionKind::SetDifficulty,
            Self::SubmitSecret(_) => ActionKind::SubmitSecret,
            Self::MakeGuess(_) => ActionKind::MakeGuess,
            Self::Restart => ActionKind::Restart,
            Self::Relay(_) => ActionKind::Relay,
            Self::Close => ActionKind::Close,
        }
    }
}

/// Which [`RoomAction`] ran, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Join,
    SetDifficulty,
    SubmitSecret,
    MakeGuess,
    Restart,
    Relay,
    Close,
}

impl ActionKind {
    fn name(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::SetDifficulty => "set_difficulty",
            Self::SubmitSecret => "submit_secret",
            Self::MakeGuess => "make_guess",
            Self::Restart => "restart",
            Self::Relay => "relay",
            Self::Close => "close",
        }
    }
}

/// Commands sent to a room actor through its channel.
///
/// Each carries a `oneshot` reply channel. The actor answers only after
/// the command's events have been handed to the gateway.
pub(crate) enum RoomCommand {
    /// Apply a player action.
    Act {
        caller: ConnectionId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Report room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Close the room if nothing was accepted for `max_idle`. Replies
    /// whether it closed.
    Expire {
        max_idle: Duration,
        reply: oneshot::Sender<bool>,
    },
}

/// A snapshot of room metadata (not the game itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: RoomPhase,
    pub digit_count: DigitCount,
    /// Populated slots, 1 or 2.
    pub players: usize,
    /// Time since the room last accepted an action.
    pub idle_for: Duration,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. The
/// [`RoomStore`](crate::RoomStore) holds one per room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Returns `true` if both handles address the same actor.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Takes the guest slot, rebinds a dead slot, or resyncs the caller.
    pub async fn join(&self, caller: ConnectionId) -> Result<(), RoomError> {
        self.act(caller, RoomAction::Join).await
    }

    pub async fn set_difficulty(
        &self,
        caller: ConnectionId,
        digit_count: i64,
    ) -> Result<(), RoomError> {
        self.act(caller, RoomAction::SetDifficulty(digit_count)).await
    }

    pub async fn submit_secret(
        &self,
        caller: ConnectionId,
        secret: String,
    ) -> Result<(), RoomError> {
        self.act(caller, RoomAction::SubmitSecret(secret)).await
    }

    pub async fn make_guess(&self, caller: ConnectionId, guess: String) -> Result<(), RoomError> {
        self.act(caller, RoomAction::MakeGuess(guess)).await
    }

    pub async fn restart(&self, caller: ConnectionId) -> Result<(), RoomError> {
        self.act(caller, RoomAction::Restart).await
    }

    /// Passes a chat or voice message to the caller's opponent.
    pub async fn relay(&self, caller: ConnectionId, content: RelayContent) -> Result<(), RoomError> {
        self.act(caller, RoomAction::Relay(content)).await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Host only. On success the actor has stopped; the store drops the
    /// handle afterwards.
    pub(crate) async fn close(&self, caller: ConnectionId) -> Result<(), RoomError> {
        self.act(caller, RoomAction::Close).await
    }

    pub(crate) async fn expire(&self, max_idle: Duration) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Expire { max_idle, reply })
            .await
    }

    async fn act(&self, caller: ConnectionId, action: RoomAction) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Act {
            caller,
            action,
            reply,
        })
        .await?
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<B> {
    room: Room,
    gateway: Arc<B>,
    last_activity: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<B: BroadcastGateway> RoomActor<B> {
    /// Runs the actor loop until the room is closed or every handle is
    /// dropped.
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Act {
                    caller,
                    action,
                    reply,
                } => {
                    let closing = action.kind() == ActionKind::Close;
                    let result = self.handle_action(caller, action).await;
                    let stop = closing && result.is_ok();
                    let _ = reply.send(result);
                    if stop {
                        break;
                    }
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Expire { max_idle, reply } => {
                    let expired = self.last_activity.elapsed() >= max_idle;
                    if expired {
                        tracing::info!(
                            room = %self.room.code(),
                            idle_secs = self.last_activity.elapsed().as_secs(),
                            "closing idle room"
                        );
                        self.dispatch(vec![(
                            Recipient::All,
                            ServerEvent::RoomClosed {
                                reason: CloseReason::Idle,
                            },
                        )])
                        .await;
                        self.gateway.dissolve(self.room.code()).await;
                    }
                    let _ = reply.send(expired);
                    if expired {
                        break;
                    }
                }
            }
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    async fn handle_action(
        &mut self,
        caller: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let kind = action.kind();
        let before = self.room.phase();

        let result = match action {
            RoomAction::Join => self.handle_join(caller).await,
            RoomAction::SetDifficulty(n) => self.room.set_difficulty(caller, n),
            RoomAction::SubmitSecret(secret) => self.room.submit_secret(caller, secret),
            RoomAction::MakeGuess(guess) => self.room.make_guess(caller, guess),
            RoomAction::Restart => self.room.restart(caller),
            RoomAction::Relay(content) => self.room.relay(caller, content),
            RoomAction::Close => self.room.close(caller),
        };

        let out = match result {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!(
                    room = %self.room.code(),
                    %caller,
                    action = kind.name(),
                    error = %e,
                    "action rejected"
                );
                return Err(e);
            }
        };

        self.last_activity = Instant::now();
        self.log_transition(kind, before);
        self.dispatch(out).await;

        if kind == ActionKind::Close {
            self.gateway.dissolve(self.room.code()).await;
            tracing::info!(room = %self.room.code(), %caller, "room closed by host");
        }

        Ok(())
    }

    async fn handle_join(&mut self, caller: ConnectionId) -> Result<Outbound, RoomError> {
        let mut dead = Vec::new();
        for role in Role::ALL {
            if let Some(conn) = self.room.connection(role) {
                if conn != caller && !self.gateway.is_connected(conn).await {
                    dead.push(conn);
                }
            }
        }

        let (outcome, out) = self.room.join(caller, |conn| !dead.contains(&conn))?;
        self.gateway.subscribe(self.room.code(), caller).await;

        tracing::info!(
            room = %self.room.code(),
            %caller,
            role = %outcome.role(),
            ?outcome,
            "player joined"
        );
        Ok(out)
    }

    fn log_transition(&self, kind: ActionKind, before: RoomPhase) {
        let after = self.room.phase();
        let code = self.room.code();
        if kind == ActionKind::Restart {
            tracing::info!(room = %code, %before, "game restarted");
            return;
        }
        if before == after {
            return;
        }
        if !before.can_transition_to(after) {
            tracing::warn!(
                room = %code,
                action = kind.name(),
                %before,
                %after,
                "unexpected phase change"
            );
            return;
        }
        match (kind, after) {
            (ActionKind::SubmitSecret, RoomPhase::InProgress) => {
                tracing::info!(room = %code, turn = %self.room.current_turn(), "game started");
            }
            (ActionKind::MakeGuess, RoomPhase::GameOver) => {
                tracing::info!(room = %code, winner = %self.room.current_turn(), "game over");
            }
            _ => {
                tracing::debug!(
                    room = %code,
                    action = kind.name(),
                    %before,
                    %after,
                    "phase changed"
                );
            }
        }
    }

    /// Hands events to the gateway in order.
    async fn dispatch(&self, out: Outbound) {
        let code = self.room.code();
        for (recipient, event) in out {
            match recipient {
                Recipient::All => self.gateway.broadcast(code, event, None).await,
                Recipient::AllExcept(excluded) => {
                    self.gateway.broadcast(code, event, Some(excluded)).await
                }
                Recipient::Connection(conn) => self.gateway.send_to(conn, event).await,
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            digit_count: self.room.digit_count(),
            players: self.room.player_count(),
            idle_for: self.last_activity.elapsed(),
        }
    }
}

/// Registers `host` with the gateway, tells them the room exists, then
/// spawns the actor and returns a handle to it.
///
/// `RoomCreated` is delivered before this returns, so it always reaches
/// the host ahead of anything the room itself sends.
pub(crate) async fn spawn_room<B: BroadcastGateway>(
    code: RoomCode,
    host: ConnectionId,
    gateway: Arc<B>,
    config: &RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    gateway.subscribe(&code, host).await;
    gateway
        .send_to(
            host,
            ServerEvent::RoomCreated {
                role: Role::Player1,
            },
        )
        .await;

    let actor = RoomActor {
        room: Room::new(code.clone(), host),
        gateway,
        last_activity: Instant::now(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
