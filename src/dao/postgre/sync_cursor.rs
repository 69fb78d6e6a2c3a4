use chrono::{DateTime, Utc};
use sqlx::Error;

use crate::model::{Sync_Cursor, Table};

impl Table<Sync_Cursor> {
    pub async fn get(&self, feed: &str) -> Result<Option<Sync_Cursor>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "Sync_Cursor"
        WHERE "SC_feed" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(feed)
            .fetch_optional(&self.pool)
            .await
    }

    /// Cursors only move forward, so a slow run finishing late cannot
    /// rewind a faster one.
    pub async fn advance(
        &self,
        feed: &str,
        block: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "Sync_Cursor" ("SC_feed", "SC_block", "SC_updated_at")
        VALUES ($1, $2, $3)
        ON CONFLICT ("SC_feed") DO UPDATE SET
            "SC_block" = GREATEST("Sync_Cursor"."SC_block", EXCLUDED."SC_block"),
            "SC_updated_at" = EXCLUDED."SC_updated_at"
        "#;

        sqlx::query(SQL)
            .bind(feed)
            .bind(block)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }
}
