use std::sync::Arc;

use crate::config::Config;
use crate::db::{DatasetRepository, UserRepository};
use crate::storage::FileStore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub datasets: Arc<dyn DatasetRepository>,
    pub users: Arc<dyn UserRepository>,
    pub store: FileStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        datasets: Arc<dyn DatasetRepository>,
        users: Arc<dyn UserRepository>,
        config: Config,
    ) -> Self {
        Self {
            datasets,
            users,
            store: FileStore::new(config.media_root.clone()),
            config: Arc::new(config),
        }
    }
}
