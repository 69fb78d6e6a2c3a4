use sqlx::Error;

use crate::model::{Bet, Table};

impl Table<Bet> {
    /// The tx hash is the idempotency key; a replayed bet is a no-op.
    pub async fn insert_if_not_exists(
        &self,
        data: &Bet,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        INSERT INTO "Bet" (
            "Tx_Hash",
            "BT_market_address",
            "BT_wallet_address",
            "BT_outcome_index",
            "BT_amount",
            "BT_block_number"
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ("Tx_Hash") DO NOTHING
        "#;

        let result = sqlx::query(SQL)
            .bind(&data.Tx_Hash)
            .bind(&data.BT_market_address)
            .bind(&data.BT_wallet_address)
            .bind(data.BT_outcome_index)
            .bind(&data.BT_amount)
            .bind(data.BT_block_number)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_market_wallet(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Vec<Bet>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Bet"
        WHERE
            "BT_market_address" = $1 AND
            "BT_wallet_address" = $2
        ORDER BY "BT_block_number" ASC
        "#;

        sqlx::query_as(SQL)
            .bind(market)
            .bind(wallet)
            .fetch_all(&self.pool)
            .await
    }
}
