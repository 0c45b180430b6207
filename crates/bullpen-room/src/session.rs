//! The per-room game state machine.
//!
//! [`Room`] is plain data plus the rules for changing it. Every operation
//! validates first and mutates second, so a rejected action leaves the
//! room untouched. On success it returns the events to deliver, each paired
//! with a [`Recipient`]; delivering them is the caller's job.
//!
//! `Room` is not synchronized. The room actor owns it, which is what keeps
//! "read → validate → mutate → decide broadcast" atomic per room.

use bullpen_protocol::{
    CloseReason, DigitCount, GameSnapshot, GuessResult, Recipient, RelayContent, RelayMessage,
    Role, RoomCode, ServerEvent,
};
use bullpen_transport::ConnectionId;

use crate::{RoomError, RoomPhase, evaluate};

/// Events produced by one operation, in delivery order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

/// How a successful join bound the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The caller was already bound; they only get a fresh snapshot.
    Resynced(Role),
    /// The caller replaced a dead connection in this slot.
    Reconnected(Role),
    /// The caller took the empty guest slot.
    Joined,
}

impl JoinOutcome {
    /// The role the caller ended up bound to.
    pub fn role(self) -> Role {
        match self {
            Self::Resynced(role) | Self::Reconnected(role) => role,
            Self::Joined => Role::Player2,
        }
    }
}

/// One occupied slot.
#[derive(Debug, Clone)]
struct Player {
    /// Overwritten in place when the player reconnects.
    connection: ConnectionId,
    secret: Option<String>,
}

impl Player {
    fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            secret: None,
        }
    }

    fn has_secret(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// A single game session between a host and a guest.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    digit_count: DigitCount,
    current_turn: Role,
    game_over: bool,
    host: Player,
    guest: Option<Player>,
    /// Guess histories indexed by [`Role::index`]. Append-only until a
    /// restart clears both together.
    guesses: [Vec<GuessResult>; 2],
}

impl Room {
    /// Opens a room with `host` as `Player1`, four digits, host to move.
    pub fn new(code: RoomCode, host: ConnectionId) -> Self {
        Self {
            code,
            digit_count: DigitCount::DEFAULT,
            current_turn: Role::Player1,
            game_over: false,
            host: Player::new(host),
            guest: None,
            guesses: [Vec::new(), Vec::new()],
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn digit_count(&self) -> DigitCount {
        self.digit_count
    }

    pub fn current_turn(&self) -> Role {
        self.current_turn
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Both secrets are in. Derived, never stored.
    pub fn is_game_started(&self) -> bool {
        self.host.has_secret() && self.guest.as_ref().is_some_and(Player::has_secret)
    }

    pub fn phase(&self) -> RoomPhase {
        if self.guest.is_none() {
            RoomPhase::AwaitingGuest
        } else if self.game_over {
            RoomPhase::GameOver
        } else if self.is_game_started() {
            RoomPhase::InProgress
        } else {
            RoomPhase::AwaitingSecrets
        }
    }

    /// Number of populated slots, 1 or 2.
    pub fn player_count(&self) -> usize {
        1 + usize::from(self.guest.is_some())
    }

    /// The connection currently bound to `role`, if the slot is populated.
    pub fn connection(&self, role: Role) -> Option<ConnectionId> {
        self.player(role).map(|p| p.connection)
    }

    /// The role `conn` is bound to, host checked first.
    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.connection(*role) == Some(conn))
    }

    /// `role`'s guesses so far, oldest first.
    pub fn history(&self, role: Role) -> &[GuessResult] {
        &self.guesses[role.index()]
    }

    fn player(&self, role: Role) -> Option<&Player> {
        match role {
            Role::Player1 => Some(&self.host),
            Role::Player2 => self.guest.as_ref(),
        }
    }

    fn player_mut(&mut self, role: Role) -> Option<&mut Player> {
        match role {
            Role::Player1 => Some(&mut self.host),
            Role::Player2 => self.guest.as_mut(),
        }
    }

    fn require_host(&self, caller: ConnectionId, action: &'static str) -> Result<(), RoomError> {
        if self.host.connection == caller {
            Ok(())
        } else {
            Err(RoomError::NotHost(action))
        }
    }

    fn require_member(&self, caller: ConnectionId) -> Result<Role, RoomError> {
        self.role_of(caller)
            .ok_or_else(|| RoomError::PlayerNotInRoom(self.code.clone()))
    }

    /// Exactly `digit_count` ASCII digits. Repeated digits are allowed.
    fn is_well_formed(&self, value: &str) -> bool {
        value.len() == self.digit_count.width() && value.bytes().all(|b| b.is_ascii_digit())
    }

    // -- Snapshots --------------------------------------------------------

    /// The room as `viewer` should see it.
    ///
    /// The viewer's own secret is included once submitted; the opponent's
    /// only after the game is over.
    pub fn snapshot_for(&self, viewer: Role) -> GameSnapshot {
        let own = self.player(viewer).and_then(|p| p.secret.clone());
        let opponent = if self.game_over {
            self.player(viewer.opponent()).and_then(|p| p.secret.clone())
        } else {
            None
        };

        GameSnapshot {
            digit_count: self.digit_count,
            current_turn: self.current_turn,
            is_game_started: self.is_game_started(),
            is_game_over: self.game_over,
            your_secret: own,
            opponent_secret: opponent,
            your_guesses: self.history(viewer).to_vec(),
            opponent_guesses: self.history(viewer.opponent()).to_vec(),
        }
    }

    // -- Operations -------------------------------------------------------

    /// Binds `caller` to a slot and sends them a snapshot.
    ///
    /// In order:
    /// 1. a caller already bound to a slot is just resynced;
    /// 2. while the room still awaits a guest, the caller takes the guest
    ///    slot and the host is told;
    /// 3. otherwise a slot whose connection is no longer live is taken
    ///    over, host first;
    /// 4. otherwise the room is full.
    ///
    /// `is_live` reports whether a stored connection is still open.
    pub fn join(
        &mut self,
        caller: ConnectionId,
        is_live: impl Fn(ConnectionId) -> bool,
    ) -> Result<(JoinOutcome, Outbound), RoomError> {
        let mut out = Outbound::new();

        let outcome = if let Some(role) = self.role_of(caller) {
            JoinOutcome::Resynced(role)
        } else if self.phase().is_joinable() {
            self.guest = Some(Player::new(caller));
            out.push((Recipient::AllExcept(caller), ServerEvent::OpponentJoined));
            JoinOutcome::Joined
        } else if !is_live(self.host.connection) {
            self.host.connection = caller;
            JoinOutcome::Reconnected(Role::Player1)
        } else if let Some(guest) = self.guest.as_mut().filter(|g| !is_live(g.connection)) {
            guest.connection = caller;
            JoinOutcome::Reconnected(Role::Player2)
        } else {
            return Err(RoomError::RoomFull(self.code.clone()));
        };

        out.push((
            Recipient::Connection(caller),
            ServerEvent::GameState(self.snapshot_for(outcome.role())),
        ));
        Ok((outcome, out))
    }

    /// Host only: switch between 3 and 4 digits. Tells the guest.
    pub fn set_difficulty(
        &mut self,
        caller: ConnectionId,
        digit_count: i64,
    ) -> Result<Outbound, RoomError> {
        self.require_host(caller, "set the difficulty")?;
        let digit_count = u8::try_from(digit_count)
            .ok()
            .and_then(DigitCount::new)
            .ok_or(RoomError::InvalidDifficulty(digit_count))?;
        if self.host.has_secret() || self.guest.as_ref().is_some_and(Player::has_secret) {
            return Err(RoomError::DifficultyLocked);
        }

        self.digit_count = digit_count;
        Ok(vec![(
            Recipient::AllExcept(caller),
            ServerEvent::DifficultySet { digit_count },
        )])
    }

    /// Stores the caller's secret. Announces the start once both are in.
    pub fn submit_secret(
        &mut self,
        caller: ConnectionId,
        secret: String,
    ) -> Result<Outbound, RoomError> {
        let role = self.require_member(caller)?;
        if self.game_over || self.is_game_started() {
            return Err(RoomError::GameInProgress);
        }
        if !self.is_well_formed(&secret) {
            return Err(RoomError::InvalidSecret(self.digit_count));
        }

        if let Some(player) = self.player_mut(role) {
            player.secret = Some(secret);
        }

        if self.is_game_started() {
            Ok(vec![(
                Recipient::All,
                ServerEvent::GameStarted {
                    turn: self.current_turn,
                },
            )])
        } else {
            Ok(Outbound::new())
        }
    }

    /// Scores the caller's guess against the opponent's secret.
    ///
    /// A guess after the game is over is silently ignored. A winning guess
    /// ends the game and sends each player a personalised snapshot with
    /// both secrets revealed; any other guess passes the turn.
    pub fn make_guess(
        &mut self,
        caller: ConnectionId,
        guess: String,
    ) -> Result<Outbound, RoomError> {
        if self.game_over {
            return Ok(Outbound::new());
        }

        let role = self.require_member(caller)?;
        if role != self.current_turn {
            return Err(RoomError::NotYourTurn);
        }
        let opponent_secret = match self.player(role.opponent()) {
            Some(p) if p.has_secret() => p.secret.clone().unwrap_or_default(),
            _ => return Err(RoomError::OpponentNotReady),
        };
        if !self.is_well_formed(&guess) {
            return Err(RoomError::InvalidGuess(self.digit_count));
        }

        let (bulls, cows) = evaluate(&opponent_secret, &guess);
        let result = GuessResult { guess, bulls, cows };
        self.guesses[role.index()].push(result.clone());

        let mut out = vec![(Recipient::All, ServerEvent::GuessResult { role, result })];

        if bulls as usize == self.digit_count.width() {
            self.game_over = true;
            for viewer in Role::ALL {
                if let Some(conn) = self.connection(viewer) {
                    out.push((
                        Recipient::Connection(conn),
                        ServerEvent::GameState(self.snapshot_for(viewer)),
                    ));
                }
            }
        } else {
            self.current_turn = role.opponent();
            out.push((
                Recipient::All,
                ServerEvent::TurnChanged {
                    turn: self.current_turn,
                },
            ));
        }

        Ok(out)
    }

    /// Host only: back to secret submission with empty histories.
    pub fn restart(&mut self, caller: ConnectionId) -> Result<Outbound, RoomError> {
        self.require_host(caller, "restart the game")?;
        let Some(guest) = self.guest.as_mut() else {
            return Err(RoomError::BothPlayersRequired);
        };

        guest.secret = None;
        self.host.secret = None;
        self.game_over = false;
        self.current_turn = Role::Player1;
        for history in &mut self.guesses {
            history.clear();
        }

        Ok(vec![(
            Recipient::All,
            ServerEvent::GameRestarted(self.snapshot_for(Role::Player1)),
        )])
    }

    /// Passes a chat or voice message to the other player.
    pub fn relay(&self, caller: ConnectionId, content: RelayContent) -> Result<Outbound, RoomError> {
        let sender = self.require_member(caller)?;
        Ok(vec![(
            Recipient::AllExcept(caller),
            ServerEvent::Chat(RelayMessage::now(sender, content)),
        )])
    }

    /// Host only: checks the caller may close the room and returns the
    /// farewell event.
    pub fn close(&self, caller: ConnectionId) -> Result<Outbound, RoomError> {
        self.require_host(caller, "close the room")?;
        Ok(vec![(
            Recipient::All,
            ServerEvent::RoomClosed {
                reason: CloseReason::HostClosed,
            },
        )])
    }
}
