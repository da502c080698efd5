use std::sync::Arc;

use crate::config::Config;
use crate::photos::PhotoStorage;
use crate::store::EntityStore;
use crate::transitions::TransitionPolicy;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub photos: PhotoStorage,
    pub transitions: TransitionPolicy,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, config: Config) -> Self {
        AppState {
            store,
            photos: PhotoStorage::new(&config.upload_dir),
            transitions: config.transitions.clone(),
            config,
        }
    }
}
