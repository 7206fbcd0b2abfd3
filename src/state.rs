use std::sync::Arc;

use diesel::{
    r2d2::{ConnectionManager, PooledConnection},
    sqlite::SqliteConnection,
};

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::DbPool,
    error::{AppError, AppResult},
    notify::Notifier,
};

type DbPooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: AppConfig,
        jwt: JwtService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            notifier,
        }
    }

    pub fn db(&self) -> AppResult<DbPooledConnection> {
        self.pool.get().map_err(AppError::from)
    }
}
