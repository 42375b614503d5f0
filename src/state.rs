use crate::config::EngineConfig;
use crate::manager::GameManager;
use crate::store::Store;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub manager: GameManager,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let manager = GameManager::new(store.clone(), config.clone());
        Self {
            store,
            manager,
            config,
        }
    }
}
