use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = PgStore::connect(&config).await?;
        if let Err(e) = store.run_migrations().await {
            tracing::warn!(error = ?e, "migration failed; continuing");
        }

        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> Self {
        Self::fake_with(AppConfig::for_tests()).0
    }

    /// State over a fresh in-memory store; the store handle is returned for seeding.
    pub fn fake_with(
        config: AppConfig,
    ) -> (Self, Arc<crate::store::memory::MemoryStore>) {
        let store = Arc::new(crate::store::memory::MemoryStore::new());
        let state = Self {
            store: store.clone(),
            config: Arc::new(config),
        };
        (state, store)
    }
}
