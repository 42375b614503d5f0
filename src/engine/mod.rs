//! Per-game phase engine.
//!
//! Each running game is an actor: a tokio task that owns the game's phase,
//! day counter, sessions and its single pending timer. It handles one event
//! at a time (a command from a [`GameHandle`] or the timer firing), so the
//! transitions of one game are serialized without any locking.

pub mod narration;
mod phase;
pub mod tally;

use crate::broadcast::{broadcast, Audience};
use crate::config::EngineConfig;
use crate::manager::GameManager;
use crate::session::{Session, SessionRegistry};
use crate::store::{PlayerFilter, Store};
use crate::types::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use ulid::Ulid;

enum Command {
    Start {
        reply: oneshot::Sender<String>,
    },
    End {
        reply: oneshot::Sender<String>,
    },
    RefreshGroupSession(Arc<dyn Session>),
    RegisterPrivateSession {
        user_id: UserId,
        session: Arc<dyn Session>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
}

/// Point-in-time view of a running game
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub game: GameRecord,
    pub phase: Phase,
    pub day: u32,
}

/// Cheap, cloneable handle to a running engine.
///
/// Once the engine has ended, requests fall back to terminal answers instead
/// of failing.
#[derive(Clone)]
pub struct GameHandle {
    game_id: GameId,
    instance: Ulid,
    tx: mpsc::Sender<Command>,
}

impl GameHandle {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Unique per engine instance, so a replacement engine is never mistaken for this one
    pub fn instance(&self) -> Ulid {
        self.instance
    }

    /// Whether the engine task has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn update_guild_session(&self, session: Arc<dyn Session>) {
        if self
            .tx
            .send(Command::RefreshGroupSession(session))
            .await
            .is_err()
        {
            tracing::debug!("Game {} has ended, group session ignored", self.game_id);
        }
    }

    pub async fn update_player_session(&self, user_id: &str, session: Arc<dyn Session>) {
        let cmd = Command::RegisterPrivateSession {
            user_id: user_id.to_string(),
            session,
        };
        if self.tx.send(cmd).await.is_err() {
            tracing::debug!("Game {} has ended, private session ignored", self.game_id);
        }
    }

    /// Begin the game: broadcast the rules and schedule the first nightfall
    pub async fn start(&self) -> String {
        self.request(|reply| Command::Start { reply })
            .await
            .unwrap_or_else(|| narration::GAME_OVER.to_string())
    }

    /// Force the game to end. Safe to call any number of times.
    pub async fn end_game(&self) -> String {
        self.request(|reply| Command::End { reply })
            .await
            .unwrap_or_else(|| narration::GAME_OVER.to_string())
    }

    pub async fn snapshot(&self) -> Option<EngineSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn phase(&self) -> Phase {
        self.snapshot()
            .await
            .map(|s| s.phase)
            .unwrap_or(Phase::Ended)
    }

    pub async fn game(&self) -> Option<GameRecord> {
        self.snapshot().await.map(|s| s.game)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.ok()?;
        rx.await.ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    PrepareTimeout,
    Nightfall,
    Dawn,
    VoteOpen,
    VoteClose,
}

struct Timer {
    kind: TimerKind,
    deadline: Instant,
}

enum Event {
    Command(Option<Command>),
    Timer,
}

pub struct GameEngine {
    game: GameRecord,
    phase: Phase,
    day: u32,
    started: bool,
    revoted: bool,
    torn_down: bool,
    sessions: SessionRegistry,
    timer: Option<Timer>,
    store: Arc<dyn Store>,
    manager: GameManager,
    config: Arc<EngineConfig>,
    instance: Ulid,
    rx: mpsc::Receiver<Command>,
}

impl GameEngine {
    /// Build an engine in the prepare phase. Nothing runs until [`GameEngine::run`] is spawned.
    pub(crate) fn new(
        game: GameRecord,
        session: Arc<dyn Session>,
        store: Arc<dyn Store>,
        manager: GameManager,
        config: Arc<EngineConfig>,
    ) -> (Self, GameHandle) {
        let (tx, rx) = mpsc::channel(64);
        let instance = Ulid::new();
        let handle = GameHandle {
            game_id: game.id,
            instance,
            tx,
        };

        let mut sessions = SessionRegistry::new(config.session_expiry);
        sessions.register_group(session);

        let mut engine = Self {
            game,
            phase: Phase::Prepare,
            day: 0,
            started: false,
            revoted: false,
            torn_down: false,
            sessions,
            timer: None,
            store,
            manager,
            config,
            instance,
            rx,
        };
        if engine.game.status == GameStatus::Preparing {
            engine.arm(TimerKind::PrepareTimeout, engine.config.prepare_timeout);
        }
        (engine, handle)
    }

    /// Process events until the game ends, then deregister from the manager
    pub(crate) async fn run(mut self) {
        tracing::debug!("Engine for game {} running", self.game.id);

        while !self.torn_down {
            let deadline = self.timer.as_ref().map(|t| t.deadline);
            let event = tokio::select! {
                cmd = self.rx.recv() => Event::Command(cmd),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Event::Timer,
            };

            match event {
                Event::Command(Some(cmd)) => self.handle(cmd).await,
                Event::Command(None) => {
                    tracing::warn!("All handles to game {} dropped, ending it", self.game.id);
                    self.teardown().await;
                }
                Event::Timer => {
                    if let Some(timer) = self.timer.take() {
                        self.on_timer(timer.kind).await;
                    }
                }
            }
        }

        self.manager.release(self.game.id, self.instance).await;
        tracing::debug!("Engine for game {} stopped", self.game.id);
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start { reply } => {
                let message = self.start().await;
                let _ = reply.send(message);
            }
            Command::End { reply } => {
                tracing::info!("Game {} ended by command", self.game.id);
                let message = self.teardown().await;
                let _ = reply.send(message);
            }
            Command::RefreshGroupSession(session) => self.sessions.refresh_group(session),
            Command::RegisterPrivateSession { user_id, session } => {
                self.sessions.register_private(&user_id, session)
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(EngineSnapshot {
                    game: self.game.clone(),
                    phase: self.phase,
                    day: self.day,
                });
            }
        }
    }

    /// Replace any pending timer
    fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.timer = Some(Timer {
            kind,
            deadline: Instant::now() + after,
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            tracing::debug!("Cancelled {:?} timer of game {}", timer.kind, self.game.id);
        }
    }

    async fn say(&mut self, message: &str) {
        broadcast(&mut self.sessions, message, Audience::Group).await;
    }

    async fn whisper(&mut self, user_id: &str, message: &str) {
        broadcast(&mut self.sessions, message, Audience::Player(user_id)).await;
    }

    async fn load_players(&self) -> Option<Vec<PlayerRecord>> {
        match self.store.find_players(PlayerFilter::game(self.game.id)).await {
            Ok(players) => Some(players),
            Err(e) => {
                tracing::error!("Failed to load players of game {}: {}", self.game.id, e);
                None
            }
        }
    }

    async fn update_players(&self, players: &[PlayerRecord], patch: PlayerPatch) {
        let updates = players
            .iter()
            .map(|p| self.store.update_player(p.id, patch.clone()));
        for result in futures::future::join_all(updates).await {
            if let Err(e) = result {
                tracing::error!("Failed to update player of game {}: {}", self.game.id, e);
            }
        }
    }
}
