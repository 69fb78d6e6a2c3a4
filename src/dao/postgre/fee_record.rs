use sqlx::Error;

use crate::model::{Fee_Record, Table};

impl Table<Fee_Record> {
    /// Replaces the row unless it already holds an event from a later
    /// position. Returns whether a row was written.
    pub async fn upsert(&self, data: &Fee_Record) -> Result<bool, Error> {
        const SQL: &str = r#"
        INSERT INTO "Fee_Record" (
            "FR_market_address",
            "FR_fee_type",
            "FR_amount",
            "FR_collector",
            "Tx_Hash",
            "FR_block_number",
            "FR_log_index",
            "FR_updated_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT ("FR_market_address", "FR_fee_type") DO UPDATE SET
            "FR_amount" = EXCLUDED."FR_amount",
            "FR_collector" = EXCLUDED."FR_collector",
            "Tx_Hash" = EXCLUDED."Tx_Hash",
            "FR_block_number" = EXCLUDED."FR_block_number",
            "FR_log_index" = EXCLUDED."FR_log_index",
            "FR_updated_at" = EXCLUDED."FR_updated_at"
        WHERE
            ("Fee_Record"."FR_block_number", "Fee_Record"."FR_log_index")
            <= (EXCLUDED."FR_block_number", EXCLUDED."FR_log_index")
        "#;

        let result = sqlx::query(SQL)
            .bind(&data.FR_market_address)
            .bind(&data.FR_fee_type)
            .bind(&data.FR_amount)
            .bind(&data.FR_collector)
            .bind(&data.Tx_Hash)
            .bind(data.FR_block_number)
            .bind(data.FR_log_index)
            .bind(data.FR_updated_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(
        &self,
        market: &str,
        fee_type: &str,
    ) -> Result<Option<Fee_Record>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Fee_Record"
        WHERE
            "FR_market_address" = $1 AND
            "FR_fee_type" = $2
        "#;

        sqlx::query_as(SQL)
            .bind(market)
            .bind(fee_type)
            .fetch_optional(&self.pool)
            .await
    }
}
