use std::sync::Arc;

use common::storage::ImageStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub media: Arc<dyn ImageStore>,
    pub config: AppConfig,
}
