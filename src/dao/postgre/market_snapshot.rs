use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, Error};

use crate::model::{Market_Ref, Market_Snapshot, Table};

impl Table<Market_Snapshot> {
    /// Full-row replace keyed by address. Every derived column is taken from
    /// the incoming row, so the last applied read wins as a whole.
    pub async fn upsert(&self, data: &Market_Snapshot) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "Market_Snapshot" (
            "MS_address",
            "MS_factory",
            "MS_factory_index",
            "MS_title",
            "MS_end_time",
            "MS_resolved",
            "MS_winning_outcome",
            "MS_pool_totals",
            "MS_last_synced_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT ("MS_address") DO UPDATE SET
            "MS_factory" = EXCLUDED."MS_factory",
            "MS_factory_index" = EXCLUDED."MS_factory_index",
            "MS_title" = EXCLUDED."MS_title",
            "MS_end_time" = EXCLUDED."MS_end_time",
            "MS_resolved" = EXCLUDED."MS_resolved",
            "MS_winning_outcome" = EXCLUDED."MS_winning_outcome",
            "MS_pool_totals" = EXCLUDED."MS_pool_totals",
            "MS_last_synced_at" = EXCLUDED."MS_last_synced_at"
        "#;

        sqlx::query(SQL)
            .bind(&data.MS_address)
            .bind(&data.MS_factory)
            .bind(data.MS_factory_index)
            .bind(&data.MS_title)
            .bind(data.MS_end_time)
            .bind(data.MS_resolved)
            .bind(data.MS_winning_outcome)
            .bind(&data.MS_pool_totals)
            .bind(data.MS_last_synced_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn update_pools(
        &self,
        address: &str,
        pools: &[BigDecimal],
        synced_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        UPDATE "Market_Snapshot"
        SET
            "MS_pool_totals" = $2,
            "MS_last_synced_at" = $3
        WHERE "MS_address" = $1
        "#;

        let result = sqlx::query(SQL)
            .bind(address)
            .bind(pools)
            .bind(synced_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_address(
        &self,
        address: &str,
    ) -> Result<Option<Market_Snapshot>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Market_Snapshot"
        WHERE "MS_address" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(address)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Market_Snapshot>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Market_Snapshot"
        WHERE "MS_id" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_refs(&self) -> Result<Vec<Market_Ref>, Error> {
        const SQL: &str = r#"
        SELECT "MS_address", "MS_factory_index"
        FROM "Market_Snapshot"
        ORDER BY "MS_id" ASC
        "#;

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }

    pub async fn delete_not_from_factory(
        &self,
        factory: &str,
    ) -> Result<u64, Error> {
        const SQL: &str = r#"
        DELETE FROM "Market_Snapshot"
        WHERE "MS_factory" <> $1
        "#;

        let result = sqlx::query(SQL)
            .bind(factory)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
