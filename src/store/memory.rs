use super::{GameFilter, PlayerFilter, Store, StoreError, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store backed by hash maps.
///
/// Every write takes the table's write lock, so `add_votes` and `mark_acted`
/// are atomic with respect to each other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    games: Arc<RwLock<HashMap<GameId, GameRecord>>>,
    players: Arc<RwLock<HashMap<PlayerId, PlayerRecord>>>,
    next_game_id: Arc<AtomicU64>,
    next_player_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_game(&self, new: NewGame) -> StoreResult<GameRecord> {
        let game = GameRecord {
            id: self.next_game_id.fetch_add(1, Ordering::SeqCst) + 1,
            group_id: new.group_id,
            status: GameStatus::Preparing,
            player_count: 0,
            creator_id: new.creator_id,
            winner: None,
        };
        self.games.write().await.insert(game.id, game.clone());
        Ok(game)
    }

    async fn find_games(&self, filter: GameFilter) -> StoreResult<Vec<GameRecord>> {
        let games = self.games.read().await;
        let mut found: Vec<GameRecord> = games
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        found.sort_by_key(|g| g.id);
        Ok(found)
    }

    async fn update_game(&self, id: GameId, patch: GamePatch) -> StoreResult<()> {
        let mut games = self.games.write().await;
        let game = games.get_mut(&id).ok_or(StoreError::NotFound {
            table: "games",
            id,
        })?;
        if let Some(status) = patch.status {
            game.status = status;
        }
        if let Some(count) = patch.player_count {
            game.player_count = count;
        }
        if patch.winner.is_some() {
            game.winner = patch.winner;
        }
        Ok(())
    }

    async fn remove_game(&self, id: GameId) -> StoreResult<()> {
        self.games.write().await.remove(&id);
        Ok(())
    }

    async fn create_player(&self, new: NewPlayer) -> StoreResult<PlayerRecord> {
        let player = PlayerRecord {
            id: self.next_player_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: new.user_id,
            game_id: new.game_id,
            sequence: new.sequence,
            nickname: new.nickname,
            role: Role::Unassigned,
            alive: true,
            execution_votes: 0,
            elimination_votes: 0,
            has_acted: false,
        };
        self.players.write().await.insert(player.id, player.clone());
        Ok(player)
    }

    async fn find_players(&self, filter: PlayerFilter) -> StoreResult<Vec<PlayerRecord>> {
        let players = self.players.read().await;
        let mut found: Vec<PlayerRecord> = players
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by_key(|p| (p.game_id, p.sequence, p.id));
        Ok(found)
    }

    async fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> StoreResult<()> {
        let mut players = self.players.write().await;
        let player = players.get_mut(&id).ok_or(StoreError::NotFound {
            table: "players",
            id,
        })?;
        if let Some(sequence) = patch.sequence {
            player.sequence = sequence;
        }
        if let Some(role) = patch.role {
            player.role = role;
        }
        if let Some(alive) = patch.alive {
            player.alive = alive;
        }
        if let Some(votes) = patch.execution_votes {
            player.execution_votes = votes;
        }
        if let Some(votes) = patch.elimination_votes {
            player.elimination_votes = votes;
        }
        if let Some(acted) = patch.has_acted {
            player.has_acted = acted;
        }
        Ok(())
    }

    async fn remove_players(&self, game_id: GameId) -> StoreResult<()> {
        self.players
            .write()
            .await
            .retain(|_, p| p.game_id != game_id);
        Ok(())
    }

    async fn add_votes(&self, id: PlayerId, kind: VoteKind, amount: u32) -> StoreResult<()> {
        let mut players = self.players.write().await;
        let player = players.get_mut(&id).ok_or(StoreError::NotFound {
            table: "players",
            id,
        })?;
        match kind {
            VoteKind::Execution => player.execution_votes += amount,
            VoteKind::Elimination => player.elimination_votes += amount,
        }
        Ok(())
    }

    async fn mark_acted(&self, id: PlayerId) -> StoreResult<bool> {
        let mut players = self.players.write().await;
        let player = players.get_mut(&id).ok_or(StoreError::NotFound {
            table: "players",
            id,
        })?;
        if player.has_acted {
            return Ok(false);
        }
        player.has_acted = true;
        Ok(true)
    }
}
