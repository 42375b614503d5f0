//! Player commands
//!
//! Each command checks its preconditions against the store and the running
//! engine, then either mutates player rows or forwards to the game manager.
//! Rejections are [`CommandError`]s whose `Display` is the text shown to the
//! caller; a rejected command never changes anything.

mod lobby;
mod player;

pub use lobby::deal_roles;

use crate::manager::ManagerError;
use crate::session::Session;
use crate::state::AppState;
use crate::store::{GameFilter, PlayerFilter, StoreError};
use crate::types::*;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { nickname: String },
    Join { nickname: String },
    Start,
    Identity,
    Kill { target: String },
    Check { target: String },
    Vote { target: String },
    Abstain,
    End,
    Info,
}

/// Who sent a command and where from
#[derive(Clone)]
pub struct CommandContext {
    pub user_id: UserId,
    /// Set when the command was sent in a group chat, `None` in private
    pub group_id: Option<GroupId>,
    /// Channel the command arrived on, used to reach this chat later
    pub session: Arc<dyn Session>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Use this command in the group chat.")]
    GroupOnly,
    #[error("Use this command in a private chat.")]
    PrivateOnly,
    #[error("Please provide a nickname.")]
    MissingNickname,
    #[error("Please name a player (number or nickname).")]
    MissingTarget,
    #[error("You are already in a game.")]
    AlreadyInGame,
    #[error("This group already has a game.")]
    GroupBusy,
    #[error("You are not in any game.")]
    NotInGame,
    #[error("There is no game waiting for players in this group.")]
    NoPreparingGame,
    #[error("There is no game in progress in this group.")]
    NoActiveGame,
    #[error("The game is full.")]
    GameFull,
    #[error("Only the creator can {0} the game.")]
    NotCreator(&'static str),
    #[error("Not enough players to start the game.")]
    NotEnoughPlayers,
    #[error("Too many players to start the game.")]
    TooManyPlayers,
    #[error("You are not the {0}.")]
    WrongRole(&'static str),
    #[error("It is not night.")]
    NotNight,
    #[error("Voting is not open.")]
    NotVoting,
    #[error("Player not found.")]
    TargetNotFound,
    #[error("That player is already dead.")]
    TargetDead,
    #[error("You are dead and can no longer act.")]
    Dead,
    #[error("You have already acted this round.")]
    AlreadyActed,
    #[error("The game could not be reached: {0}")]
    Manager(#[from] ManagerError),
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Stable machine readable code for protocol errors
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::GroupOnly => "GROUP_ONLY",
            CommandError::PrivateOnly => "PRIVATE_ONLY",
            CommandError::MissingNickname => "MISSING_NICKNAME",
            CommandError::MissingTarget => "MISSING_TARGET",
            CommandError::AlreadyInGame => "ALREADY_IN_GAME",
            CommandError::GroupBusy => "GROUP_BUSY",
            CommandError::NotInGame => "NOT_IN_GAME",
            CommandError::NoPreparingGame => "NO_PREPARING_GAME",
            CommandError::NoActiveGame => "NO_ACTIVE_GAME",
            CommandError::GameFull => "GAME_FULL",
            CommandError::NotCreator(_) => "NOT_CREATOR",
            CommandError::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            CommandError::TooManyPlayers => "TOO_MANY_PLAYERS",
            CommandError::WrongRole(_) => "WRONG_ROLE",
            CommandError::NotNight => "NOT_NIGHT",
            CommandError::NotVoting => "NOT_VOTING",
            CommandError::TargetNotFound => "TARGET_NOT_FOUND",
            CommandError::TargetDead => "TARGET_DEAD",
            CommandError::Dead => "DEAD",
            CommandError::AlreadyActed => "ALREADY_ACTED",
            CommandError::Manager(_) => "GAME_UNAVAILABLE",
            CommandError::Store(_) => "STORAGE_FAILURE",
        }
    }
}

pub type CommandResult = Result<Option<String>, CommandError>;

/// Run a command. `Ok(None)` means the engine already answered in the group.
pub async fn dispatch(state: &AppState, ctx: &CommandContext, cmd: Command) -> CommandResult {
    tracing::debug!("Command from {}: {:?}", ctx.user_id, cmd);
    match cmd {
        Command::Create { nickname } => lobby::create(state, ctx, &nickname).await,
        Command::Join { nickname } => lobby::join(state, ctx, &nickname).await,
        Command::Start => lobby::start(state, ctx).await,
        Command::End => lobby::end(state, ctx).await,
        Command::Info => lobby::info(state, ctx).await,
        Command::Identity => player::identity(state, ctx).await,
        Command::Kill { target } => player::kill(state, ctx, &target).await,
        Command::Check { target } => player::check(state, ctx, &target).await,
        Command::Vote { target } => player::vote(state, ctx, &target).await,
        Command::Abstain => player::abstain(state, ctx).await,
    }
}

fn require_group(ctx: &CommandContext) -> Result<&str, CommandError> {
    ctx.group_id.as_deref().ok_or(CommandError::GroupOnly)
}

fn require_private(ctx: &CommandContext) -> Result<(), CommandError> {
    match ctx.group_id {
        Some(_) => Err(CommandError::PrivateOnly),
        None => Ok(()),
    }
}

/// Keep the group's running engine talking to the chat this command came from
async fn refresh_group_session(state: &AppState, ctx: &CommandContext, group_id: &str) {
    let games = match state.store.find_games(GameFilter::active_in_group(group_id)).await {
        Ok(games) => games,
        Err(e) => {
            tracing::warn!("Could not look up games of group {}: {}", group_id, e);
            return;
        }
    };
    if let Some(game) = games.first() {
        if let Some(handle) = state.manager.get_game_state(game.id).await {
            handle.update_guild_session(ctx.session.clone()).await;
        }
    }
}

async fn active_game(state: &AppState, group_id: &str) -> Result<GameRecord, CommandError> {
    state
        .store
        .find_games(GameFilter::active_in_group(group_id))
        .await?
        .into_iter()
        .next()
        .ok_or(CommandError::NoActiveGame)
}

/// The caller's player row, in whatever game they joined
async fn caller(state: &AppState, user_id: &str) -> Result<PlayerRecord, CommandError> {
    state
        .store
        .find_players(PlayerFilter::user(user_id))
        .await?
        .into_iter()
        .next()
        .ok_or(CommandError::NotInGame)
}

async fn roster(state: &AppState, game_id: GameId) -> Result<Vec<PlayerRecord>, CommandError> {
    Ok(state.store.find_players(PlayerFilter::game(game_id)).await?)
}

fn find_target<'a>(
    players: &'a [PlayerRecord],
    target: &str,
) -> Result<&'a PlayerRecord, CommandError> {
    if target.trim().is_empty() {
        return Err(CommandError::MissingTarget);
    }
    players
        .iter()
        .find(|p| p.matches_target(target))
        .ok_or(CommandError::TargetNotFound)
}

/// Current phase of the game's engine, `None` when no engine runs it
async fn current_phase(state: &AppState, game_id: GameId) -> Option<Phase> {
    let handle = state.manager.get_game_state(game_id).await?;
    Some(handle.phase().await)
}

/// "1. Alice" lines, with dead players marked
fn player_list(players: &[PlayerRecord]) -> String {
    players
        .iter()
        .map(|p| {
            let status = if p.alive { "" } else { " (dead)" };
            format!("{}. {}{}", p.sequence, p.nickname, status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
