use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;

use crate::{
    error::Error,
    model::{
        Action_History, Bet, Fee_Record, Market_Ref, Market_Snapshot, Payout,
        Pool_Total, UpsertOutcome,
    },
};

/// Off-chain mirror. Addresses and hashes are passed already normalized.
///
/// Every write is keyed by a natural unique key so that concurrent flows
/// never need a read-modify-write cycle.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or fully replace the row for `MS_address`. `MS_id` is assigned
    /// by the store and kept across replacements.
    async fn upsert_market(&self, row: Market_Snapshot) -> Result<(), Error>;

    /// Replaces only the pool totals of an existing market. Returns false if
    /// the market is not mirrored.
    async fn update_market_pools(
        &self,
        address: &str,
        pools: Vec<BigDecimal>,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, Error>;

    async fn get_market_by_address(
        &self,
        address: &str,
    ) -> Result<Option<Market_Snapshot>, Error>;

    async fn get_market_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Market_Snapshot>, Error>;

    async fn list_markets(&self) -> Result<Vec<Market_Ref>, Error>;

    /// Deletes markets recorded under any factory other than `factory`.
    async fn purge_foreign_markets(&self, factory: &str) -> Result<u64, Error>;

    /// Returns false when the tx hash is already recorded.
    async fn insert_bet(&self, bet: Bet) -> Result<bool, Error>;

    async fn get_bets(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Vec<Bet>, Error>;

    async fn get_payout(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Option<Payout>, Error>;

    /// Fails with `StoreConflict` when `(market, wallet)` already has a row.
    async fn insert_payout(&self, payout: Payout) -> Result<(), Error>;

    /// Applied only if no stored row comes from a later (block, log index).
    async fn upsert_fee_record(
        &self,
        row: Fee_Record,
    ) -> Result<UpsertOutcome, Error>;

    async fn get_fee_record(
        &self,
        market: &str,
        fee_type: &str,
    ) -> Result<Option<Fee_Record>, Error>;

    /// Applied only if no stored row comes from a later (block, log index).
    async fn upsert_pool_total(
        &self,
        row: Pool_Total,
    ) -> Result<UpsertOutcome, Error>;

    async fn get_pool_totals(
        &self,
        market: &str,
    ) -> Result<Vec<Pool_Total>, Error>;

    async fn get_cursor(&self, feed: &str) -> Result<Option<u64>, Error>;

    async fn set_cursor(&self, feed: &str, block: u64) -> Result<(), Error>;

    async fn insert_action(&self, action: Action_History) -> Result<(), Error>;

    async fn get_last_action(
        &self,
        action_type: &str,
    ) -> Result<Option<Action_History>, Error>;
}
