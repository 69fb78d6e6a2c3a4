use sqlx::Error;

use crate::model::{Pool_Total, Table};

impl Table<Pool_Total> {
    /// Same ordering guard as fee records: an older event never overwrites
    /// a newer total.
    pub async fn upsert(&self, data: &Pool_Total) -> Result<bool, Error> {
        const SQL: &str = r#"
        INSERT INTO "Pool_Total" (
            "PT_market_address",
            "PT_outcome_index",
            "PT_total",
            "Tx_Hash",
            "PT_block_number",
            "PT_log_index",
            "PT_updated_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("PT_market_address", "PT_outcome_index") DO UPDATE SET
            "PT_total" = EXCLUDED."PT_total",
            "Tx_Hash" = EXCLUDED."Tx_Hash",
            "PT_block_number" = EXCLUDED."PT_block_number",
            "PT_log_index" = EXCLUDED."PT_log_index",
            "PT_updated_at" = EXCLUDED."PT_updated_at"
        WHERE
            ("Pool_Total"."PT_block_number", "Pool_Total"."PT_log_index")
            <= (EXCLUDED."PT_block_number", EXCLUDED."PT_log_index")
        "#;

        let result = sqlx::query(SQL)
            .bind(&data.PT_market_address)
            .bind(data.PT_outcome_index)
            .bind(&data.PT_total)
            .bind(&data.Tx_Hash)
            .bind(data.PT_block_number)
            .bind(data.PT_log_index)
            .bind(data.PT_updated_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_market(
        &self,
        market: &str,
    ) -> Result<Vec<Pool_Total>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Pool_Total"
        WHERE "PT_market_address" = $1
        ORDER BY "PT_outcome_index" ASC
        "#;

        sqlx::query_as(SQL)
            .bind(market)
            .fetch_all(&self.pool)
            .await
    }
}
