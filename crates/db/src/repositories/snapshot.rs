use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pipecast_core::{
    DateRange, Opportunity, OpportunityId, SnapshotRecord, SnapshotStore, StoreError,
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::DbPool;

use super::{db_error, parse_decimal_opt, SqlOpportunityRepository};

#[derive(Clone, Debug)]
pub struct NewSnapshot {
    pub opportunity_id: OpportunityId,
    pub stage: Option<String>,
    pub annualized_value: Option<Decimal>,
    pub total_contract_value: Option<Decimal>,
    pub close_date: Option<NaiveDate>,
    pub loss_reason: Option<String>,
    pub entered_pipeline: Option<NaiveDate>,
}

#[derive(Clone, Debug)]
pub struct NewBatch {
    pub batch_date: NaiveDate,
    pub snapshot_date: NaiveDate,
    pub source: Option<String>,
    pub rows: Vec<NewSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_id: i64,
    pub snapshot_date: NaiveDate,
    pub inserted: usize,
}

/// SQLite-backed snapshot store. Reads serve the report engine through
/// [`SnapshotStore`]; ingest and the destructive reset operations are
/// inherent methods kept off that trait.
pub struct SqlSnapshotRepository {
    pool: DbPool,
    opportunities: SqlOpportunityRepository,
}

impl SqlSnapshotRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { opportunities: SqlOpportunityRepository::new(pool.clone()), pool }
    }

    /// Inserts one upload batch and all of its snapshots atomically.
    pub async fn record_batch(&self, batch: NewBatch) -> Result<BatchSummary, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let now = Utc::now().to_rfc3339();

        let inserted_batch = sqlx::query(
            "INSERT INTO upload_batch (batch_date, snapshot_date, source, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(batch.batch_date)
        .bind(batch.snapshot_date)
        .bind(batch.source.as_deref())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        let batch_id = inserted_batch.last_insert_rowid();

        let inserted = batch.rows.len();
        for row in batch.rows {
            sqlx::query(
                "INSERT INTO snapshot (
                    opportunity_id, batch_id, snapshot_date, stage,
                    annualized_value, total_contract_value, close_date,
                    loss_reason, entered_pipeline, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.opportunity_id.0)
            .bind(batch_id)
            .bind(batch.snapshot_date)
            .bind(row.stage.as_deref().map(str::trim))
            .bind(row.annualized_value.map(|v| v.to_string()))
            .bind(row.total_contract_value.map(|v| v.to_string()))
            .bind(row.close_date)
            .bind(row.loss_reason.as_deref().map(str::trim))
            .bind(row.entered_pipeline)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(BatchSummary { batch_id, snapshot_date: batch.snapshot_date, inserted })
    }

    /// Bulk data reset. Destructive; isolation from concurrent readers is
    /// the database's job, not the engine's.
    pub async fn clear_all(&self) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let snapshots =
            sqlx::query("DELETE FROM snapshot").execute(&mut *tx).await.map_err(db_error)?;
        sqlx::query("DELETE FROM upload_batch").execute(&mut *tx).await.map_err(db_error)?;
        sqlx::query("DELETE FROM opportunity").execute(&mut *tx).await.map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(snapshots.rows_affected())
    }

    /// Removes every batch sharing the given snapshot date, with its
    /// snapshots.
    pub async fn clear_batches_by_date(&self, snapshot_date: NaiveDate) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let snapshots = sqlx::query(
            "DELETE FROM snapshot WHERE batch_id IN
             (SELECT id FROM upload_batch WHERE snapshot_date = ?)",
        )
        .bind(snapshot_date)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        sqlx::query("DELETE FROM upload_batch WHERE snapshot_date = ?")
            .bind(snapshot_date)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(snapshots.rows_affected())
    }
}

#[async_trait]
impl SnapshotStore for SqlSnapshotRepository {
    async fn list_snapshots_for(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<SnapshotRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, opportunity_id, snapshot_date, stage, annualized_value,
                    total_contract_value, close_date, loss_reason, entered_pipeline
             FROM snapshot WHERE opportunity_id = ?
             ORDER BY snapshot_date ASC, id ASC",
        )
        .bind(opportunity_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(snapshot_from_row).collect()
    }

    async fn list_snapshots(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<SnapshotRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, opportunity_id, snapshot_date, stage, annualized_value,
                    total_contract_value, close_date, loss_reason, entered_pipeline
             FROM snapshot
             WHERE (?1 IS NULL OR snapshot_date >= ?1)
               AND (?2 IS NULL OR snapshot_date <= ?2)
             ORDER BY snapshot_date ASC, id ASC",
        )
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(snapshot_from_row).collect()
    }

    async fn latest_batch_date(
        &self,
        at_or_before: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>, StoreError> {
        sqlx::query_scalar(
            "SELECT MAX(snapshot_date) FROM upload_batch
             WHERE (?1 IS NULL OR snapshot_date <= ?1)",
        )
        .bind(at_or_before)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn list_opportunities(&self) -> Result<Vec<Opportunity>, StoreError> {
        self.opportunities.list().await
    }

    async fn get_opportunity(
        &self,
        id: OpportunityId,
    ) -> Result<Option<Opportunity>, StoreError> {
        self.opportunities.get(id).await
    }
}

fn snapshot_from_row(row: &SqliteRow) -> Result<SnapshotRecord, StoreError> {
    Ok(SnapshotRecord {
        id: row.try_get("id").map_err(db_error)?,
        opportunity_id: OpportunityId(row.try_get("opportunity_id").map_err(db_error)?),
        snapshot_date: row.try_get("snapshot_date").map_err(db_error)?,
        stage: row.try_get("stage").map_err(db_error)?,
        annualized_value: parse_decimal_opt(
            "snapshot.annualized_value",
            row.try_get("annualized_value").map_err(db_error)?,
        )?,
        total_contract_value: parse_decimal_opt(
            "snapshot.total_contract_value",
            row.try_get("total_contract_value").map_err(db_error)?,
        )?,
        close_date: row.try_get("close_date").map_err(db_error)?,
        loss_reason: row.try_get("loss_reason").map_err(db_error)?,
        entered_pipeline: row.try_get("entered_pipeline").map_err(db_error)?,
    })
}
