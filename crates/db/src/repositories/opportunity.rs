use chrono::Utc;
use pipecast_core::domain::opportunity::{
    external_ids_refer_to_same_deal, EXTERNAL_ID_BASE_LEN, EXTERNAL_ID_EXTENDED_LEN,
};
use pipecast_core::{Opportunity, OpportunityId, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::DbPool;

use super::db_error;

#[derive(Clone, Debug)]
pub struct NewOpportunity {
    pub external_id: String,
    pub name: String,
    pub account_name: Option<String>,
    pub owner: Option<String>,
}

/// Opportunity rows are created on first observation and immutable
/// afterwards, except for the external-id upgrade from the 15-char base
/// form to the 18-char extended form.
pub struct SqlOpportunityRepository {
    pool: DbPool,
}

impl SqlOpportunityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, external_id, name, account_name, owner FROM opportunity ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(opportunity_from_row).collect()
    }

    pub async fn get(&self, id: OpportunityId) -> Result<Option<Opportunity>, StoreError> {
        let row = sqlx::query(
            "SELECT id, external_id, name, account_name, owner FROM opportunity WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(opportunity_from_row).transpose()
    }

    /// Returns the id of the matching opportunity, inserting it on first
    /// observation. An incoming extended external id upgrades a stored base
    /// id in place; an incoming base id reuses a stored extended row.
    pub async fn upsert(&self, new: NewOpportunity) -> Result<OpportunityId, StoreError> {
        let external_id = new.external_id.trim().to_string();

        if let Some(existing) = self.find_by_external_id(&external_id).await? {
            if external_id.len() == EXTERNAL_ID_EXTENDED_LEN
                && existing.external_id.len() == EXTERNAL_ID_BASE_LEN
            {
                sqlx::query("UPDATE opportunity SET external_id = ? WHERE id = ?")
                    .bind(&external_id)
                    .bind(existing.id.0)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error)?;
            }
            return Ok(existing.id);
        }

        let inserted = sqlx::query(
            "INSERT INTO opportunity (external_id, name, account_name, owner, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&external_id)
        .bind(new.name.trim())
        .bind(new.account_name.as_deref().map(str::trim))
        .bind(new.owner.as_deref().map(str::trim))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(OpportunityId(inserted.last_insert_rowid()))
    }

    /// Exact match first, then the base/extended counterpart.
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Opportunity>, StoreError> {
        let exact = sqlx::query(
            "SELECT id, external_id, name, account_name, owner FROM opportunity
             WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        if let Some(row) = exact {
            return opportunity_from_row(&row).map(Some);
        }

        let prefix = match external_id.len() {
            EXTERNAL_ID_BASE_LEN => external_id.to_string(),
            EXTERNAL_ID_EXTENDED_LEN => external_id[..EXTERNAL_ID_BASE_LEN].to_string(),
            _ => return Ok(None),
        };
        let candidates = sqlx::query(
            "SELECT id, external_id, name, account_name, owner FROM opportunity
             WHERE external_id LIKE ? || '%'",
        )
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        for row in &candidates {
            let candidate = opportunity_from_row(row)?;
            if external_ids_refer_to_same_deal(&candidate.external_id, external_id) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

fn opportunity_from_row(row: &SqliteRow) -> Result<Opportunity, StoreError> {
    Ok(Opportunity {
        id: OpportunityId(row.try_get("id").map_err(db_error)?),
        external_id: row.try_get("external_id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        account_name: row.try_get("account_name").map_err(db_error)?,
        owner: row.try_get("owner").map_err(db_error)?,
    })
}
