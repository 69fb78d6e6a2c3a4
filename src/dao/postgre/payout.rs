use sqlx::Error;

use crate::model::{Payout, Table};

impl Table<Payout> {
    /// Plain insert; the `(market, wallet)` unique constraint decides which
    /// of two concurrent claims wins.
    pub async fn insert(&self, data: &Payout) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "Payout" (
            "PO_market_address",
            "PO_user_wallet",
            "PO_outcome_index",
            "PO_amount",
            "Tx_Hash",
            "PO_created_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        sqlx::query(SQL)
            .bind(&data.PO_market_address)
            .bind(&data.PO_user_wallet)
            .bind(data.PO_outcome_index)
            .bind(&data.PO_amount)
            .bind(&data.Tx_Hash)
            .bind(data.PO_created_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn get(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Option<Payout>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Payout"
        WHERE
            "PO_market_address" = $1 AND
            "PO_user_wallet" = $2
        "#;

        sqlx::query_as(SQL)
            .bind(market)
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await
    }
}
