//! Persistence port for game and player records.
//!
//! The engine and command layer only ever talk to [`Store`]; any backend that
//! offers read-your-writes semantics can stand behind it.

mod memory;

pub use memory::MemoryStore;

use crate::types::*;
use async_trait::async_trait;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: u64 },

    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Criteria for game lookups; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub id: Option<GameId>,
    pub group_id: Option<GroupId>,
    /// Match any of these statuses (empty = any status)
    pub statuses: Vec<GameStatus>,
}

impl GameFilter {
    pub fn id(id: GameId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Games in this group that are still preparing or running
    pub fn active_in_group(group_id: &str) -> Self {
        Self {
            group_id: Some(group_id.to_string()),
            statuses: vec![GameStatus::Preparing, GameStatus::InProgress],
            ..Default::default()
        }
    }

    pub fn preparing_in_group(group_id: &str) -> Self {
        Self {
            group_id: Some(group_id.to_string()),
            statuses: vec![GameStatus::Preparing],
            ..Default::default()
        }
    }

    pub fn matches(&self, game: &GameRecord) -> bool {
        self.id.is_none_or(|id| id == game.id)
            && self.group_id.as_ref().is_none_or(|g| *g == game.group_id)
            && (self.statuses.is_empty() || self.statuses.contains(&game.status))
    }
}

/// Criteria for player lookups; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub game_id: Option<GameId>,
    pub user_id: Option<UserId>,
}

impl PlayerFilter {
    pub fn game(game_id: GameId) -> Self {
        Self {
            game_id: Some(game_id),
            ..Default::default()
        }
    }

    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, player: &PlayerRecord) -> bool {
        self.game_id.is_none_or(|id| id == player.game_id)
            && self.user_id.as_ref().is_none_or(|u| *u == player.user_id)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_game(&self, new: NewGame) -> StoreResult<GameRecord>;

    async fn find_games(&self, filter: GameFilter) -> StoreResult<Vec<GameRecord>>;

    async fn update_game(&self, id: GameId, patch: GamePatch) -> StoreResult<()>;

    async fn remove_game(&self, id: GameId) -> StoreResult<()>;

    async fn create_player(&self, new: NewPlayer) -> StoreResult<PlayerRecord>;

    /// Players matching the filter, ordered by sequence number
    async fn find_players(&self, filter: PlayerFilter) -> StoreResult<Vec<PlayerRecord>>;

    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> StoreResult<()>;

    /// Remove every player row of a game
    async fn remove_players(&self, game_id: GameId) -> StoreResult<()>;

    /// Atomically add to one of the player's vote counters
    async fn add_votes(&self, id: PlayerId, kind: VoteKind, amount: u32) -> StoreResult<()>;

    /// Atomically set the acted flag. Returns `false` if it was already set.
    async fn mark_acted(&self, id: PlayerId) -> StoreResult<bool>;

    async fn get_game(&self, id: GameId) -> StoreResult<Option<GameRecord>> {
        Ok(self.find_games(GameFilter::id(id)).await?.into_iter().next())
    }
}
