use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use trailhead_core::StoreError;

use crate::app_config::DatabaseConfig;

/// Postgres pool shared by the trip and registration repositories
#[derive(Clone)]
pub struct DbClient {
    pub pool: PgPool,
}

impl DbClient {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        info!("Postgres pool ready ({} connections max)", config.max_connections);
        Ok(Self { pool })
    }

    /// Applies `migrations/` (trips and registrations tables)
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Schema is up to date");
        Ok(())
    }
}

pub(crate) fn backend_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}
