use pipecast_core::config::{AppConfig, ConfigError, LoadOptions};
use pipecast_db::{connect, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    Ok(Application { config, db_pool })
}

#[cfg(test)]
mod tests {
    use pipecast_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap_with_config;

    fn memory_config(database_url: &str) -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load config")
    }

    #[tokio::test]
    async fn bootstrap_connects_and_applies_the_baseline_schema() {
        let app = bootstrap_with_config(memory_config("sqlite::memory:")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('opportunity', 'upload_batch', 'snapshot')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables present");
        assert_eq!(table_count, 3);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_surfaces_connection_failures() {
        let result =
            bootstrap_with_config(memory_config("sqlite:///no-such-dir/pipecast.db")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database connection failed"));
    }
}
