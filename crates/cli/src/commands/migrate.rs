use pipecast_db::{connect, migrations};

use crate::commands::{self, CommandResult, FailureKind};

pub fn run() -> CommandResult {
    let config = match commands::load_config("migrate") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = commands::block_on("migrate", async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (FailureKind::DbConnectivity, error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| (FailureKind::Migration, error.to_string()))?;
        pool.close().await;
        Ok(())
    });

    match outcome {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(result) => result,
    }
}
