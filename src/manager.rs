//! Registry of running games.
//!
//! The manager is the only owner of engine handles that outlives a request.
//! The hosting application builds one at startup, passes it to whoever needs
//! lookups, and calls [`GameManager::shutdown`] on exit.

use crate::config::EngineConfig;
use crate::engine::{GameEngine, GameHandle};
use crate::session::Session;
use crate::store::{Store, StoreError};
use crate::types::GameId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct GameManager {
    games: Arc<RwLock<HashMap<GameId, GameHandle>>>,
    store: Arc<dyn Store>,
    config: Arc<EngineConfig>,
}

impl GameManager {
    pub fn new(store: Arc<dyn Store>, config: Arc<EngineConfig>) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawn an engine for the game in the prepare phase, or return the running one.
    ///
    /// A game still marked preparing gets the prepare timeout armed.
    pub async fn open_game(
        &self,
        game_id: GameId,
        session: Arc<dyn Session>,
    ) -> Result<GameHandle, ManagerError> {
        let game = self
            .store
            .get_game(game_id)
            .await?
            .ok_or(ManagerError::GameNotFound(game_id))?;

        let mut games = self.games.write().await;
        if let Some(existing) = games.get(&game_id).filter(|h| !h.is_closed()).cloned() {
            drop(games);
            existing.update_guild_session(session).await;
            return Ok(existing);
        }

        let (engine, handle) = GameEngine::new(
            game,
            session,
            self.store.clone(),
            self.clone(),
            self.config.clone(),
        );
        games.insert(game_id, handle.clone());
        drop(games);

        tokio::spawn(engine.run());
        tracing::info!("Opened game {}", game_id);
        Ok(handle)
    }

    /// Start the game's engine, spawning it first if needed. Returns the rules text.
    pub async fn start_game(
        &self,
        game_id: GameId,
        session: Arc<dyn Session>,
    ) -> Result<String, ManagerError> {
        let handle = self.open_game(game_id, session).await?;
        Ok(handle.start().await)
    }

    pub async fn get_game_state(&self, game_id: GameId) -> Option<GameHandle> {
        self.games.read().await.get(&game_id).cloned()
    }

    pub async fn remove_game(&self, game_id: GameId) -> Option<GameHandle> {
        self.games.write().await.remove(&game_id)
    }

    /// Ids of every registered game
    pub async fn running_games(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.games.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Called by an engine when it stops; only removes the entry if it is still that engine's
    pub(crate) async fn release(&self, game_id: GameId, instance: Ulid) {
        let mut games = self.games.write().await;
        if games.get(&game_id).is_some_and(|h| h.instance() == instance) {
            games.remove(&game_id);
            tracing::debug!("Released game {}", game_id);
        }
    }

    /// End every running game and clear the registry
    pub async fn shutdown(&self) {
        let handles: Vec<GameHandle> = self.games.write().await.drain().map(|(_, h)| h).collect();
        if !handles.is_empty() {
            tracing::info!("Shutting down {} running game(s)", handles.len());
        }
        for handle in handles {
            handle.end_game().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChannelSession;
    use crate::store::MemoryStore;
    use crate::types::*;
    use std::time::Duration;

    async fn setup(status: GameStatus) -> (GameManager, Arc<MemoryStore>, GameId) {
        let store = Arc::new(MemoryStore::new());
        let game = store
            .create_game(NewGame {
                group_id: "g1".to_string(),
                creator_id: "alice".to_string(),
            })
            .await
            .unwrap();
        store
            .update_game(
                game.id,
                GamePatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let manager = GameManager::new(store.clone(), Arc::new(EngineConfig::default()));
        (manager, store, game.id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_unknown_game_fails() {
        let store = Arc::new(MemoryStore::new());
        let manager = GameManager::new(store, Arc::new(EngineConfig::default()));
        let (session, _rx) = ChannelSession::pair("g1");

        let err = manager.start_game(7, session).await.unwrap_err();
        assert!(matches!(err, ManagerError::GameNotFound(7)));
        assert!(manager.get_game_state(7).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_game_is_idempotent() {
        let (manager, _store, id) = setup(GameStatus::Preparing).await;
        let (s1, _rx1) = ChannelSession::pair("g1-a");
        let (s2, _rx2) = ChannelSession::pair("g1-b");

        let first = manager.open_game(id, s1).await.unwrap();
        let second = manager.open_game(id, s2).await.unwrap();
        assert_eq!(first.instance(), second.instance());
        assert_eq!(manager.running_games().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_game_registers_and_starts() {
        let (manager, _store, id) = setup(GameStatus::InProgress).await;
        let (session, mut rx) = ChannelSession::pair("g1");

        let rules = manager.start_game(id, session).await.unwrap();
        assert!(rules.contains("The game begins"));
        assert_eq!(rx.recv().await.unwrap(), rules);

        let handle = manager.get_game_state(id).await.unwrap();
        assert_eq!(handle.phase().await, Phase::Prepare);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_game_deregisters() {
        let (manager, _store, id) = setup(GameStatus::InProgress).await;
        let (session, _rx) = ChannelSession::pair("g1");
        manager.start_game(id, session).await.unwrap();

        let removed = manager.remove_game(id).await.unwrap();
        assert!(manager.get_game_state(id).await.is_none());
        removed.end_game().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_ignores_other_instance() {
        let (manager, _store, id) = setup(GameStatus::InProgress).await;
        let (session, _rx) = ChannelSession::pair("g1");
        let handle = manager.open_game(id, session).await.unwrap();

        manager.release(id, Ulid::new()).await;
        assert!(manager.get_game_state(id).await.is_some());

        manager.release(id, handle.instance()).await;
        assert!(manager.get_game_state(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_everything() {
        let (manager, store, id) = setup(GameStatus::InProgress).await;
        let (session, _rx) = ChannelSession::pair("g1");
        manager.start_game(id, session).await.unwrap();

        manager.shutdown().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(manager.running_games().await.is_empty());
        assert!(store.get_game(id).await.unwrap().is_none());
    }
}
