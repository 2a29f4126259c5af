use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, db::DbPool, notifications::NotificationCenter};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub notifications: NotificationCenter,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            notifications: NotificationCenter::new(),
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.orm.get_postgres_connection_pool()
    }
}
