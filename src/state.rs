use std::sync::Arc;

use crate::services::SyncService;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
}
