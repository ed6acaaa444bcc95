use pipecast_db::{connect, migrations, DemoDataset};

use crate::commands::{self, CommandResult, FailureKind};

pub fn run() -> CommandResult {
    let config = match commands::load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = commands::block_on("seed", async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (FailureKind::DbConnectivity, error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| (FailureKind::Migration, error.to_string()))?;

        let summary = DemoDataset::load(&pool)
            .await
            .map_err(|error| (FailureKind::SeedExecution, error.to_string()))?;

        pool.close().await;
        Ok(summary)
    });

    match outcome {
        Ok(summary) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: {} opportunities, {} upload batches, {} snapshots",
                summary.opportunities, summary.batches, summary.snapshots
            ),
        ),
        Err(result) => result,
    }
}
