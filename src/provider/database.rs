use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;

use crate::{
    configuration::Config,
    dao::{
        PoolOption, PoolType, Store, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION,
    },
    error::Error,
    model::{
        Action_History, Bet, Fee_Record, Market_Ref, Market_Snapshot, Payout,
        Pool_Total, Sync_Cursor, Table, UpsertOutcome,
    },
};

#[derive(Debug)]
pub struct DatabasePool {
    pub market_snapshot: Table<Market_Snapshot>,
    pub bet: Table<Bet>,
    pub payout: Table<Payout>,
    pub fee_record: Table<Fee_Record>,
    pub pool_total: Table<Pool_Total>,
    pub sync_cursor: Table<Sync_Cursor>,
    pub action_history: Table<Action_History>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            market_snapshot: Table::new(pool.clone()),
            bet: Table::new(pool.clone()),
            payout: Table::new(pool.clone()),
            fee_record: Table::new(pool.clone()),
            pool_total: Table::new(pool.clone()),
            sync_cursor: Table::new(pool.clone()),
            action_history: Table::new(pool.clone()),
            pool,
        })
    }
}

fn outcome(applied: bool) -> UpsertOutcome {
    if applied {
        UpsertOutcome::Applied
    } else {
        UpsertOutcome::Stale
    }
}

#[async_trait]
impl Store for DatabasePool {
    async fn upsert_market(&self, row: Market_Snapshot) -> Result<(), Error> {
        Ok(self.market_snapshot.upsert(&row).await?)
    }

    async fn update_market_pools(
        &self,
        address: &str,
        pools: Vec<BigDecimal>,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        Ok(self
            .market_snapshot
            .update_pools(address, &pools, synced_at)
            .await?)
    }

    async fn get_market_by_address(
        &self,
        address: &str,
    ) -> Result<Option<Market_Snapshot>, Error> {
        Ok(self.market_snapshot.get_by_address(address).await?)
    }

    async fn get_market_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Market_Snapshot>, Error> {
        Ok(self.market_snapshot.get_by_id(id).await?)
    }

    async fn list_markets(&self) -> Result<Vec<Market_Ref>, Error> {
        Ok(self.market_snapshot.get_refs().await?)
    }

    async fn purge_foreign_markets(&self, factory: &str) -> Result<u64, Error> {
        Ok(self.market_snapshot.delete_not_from_factory(factory).await?)
    }

    async fn insert_bet(&self, bet: Bet) -> Result<bool, Error> {
        match self.bet.insert_if_not_exists(&bet).await {
            Ok(inserted) => Ok(inserted),
            Err(sqlx::Error::Database(e))
                if e.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                Err(Error::MarketNotFound(bet.BT_market_address))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn get_bets(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Vec<Bet>, Error> {
        Ok(self.bet.get_by_market_wallet(market, wallet).await?)
    }

    async fn get_payout(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Option<Payout>, Error> {
        Ok(self.payout.get(market, wallet).await?)
    }

    async fn insert_payout(&self, payout: Payout) -> Result<(), Error> {
        match self.payout.insert(&payout).await {
            Ok(()) => Ok(()),
            Err(sqlx::Error::Database(e))
                if e.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(Error::StoreConflict(format!(
                    "payout exists for market {} wallet {}",
                    payout.PO_market_address, payout.PO_user_wallet
                )))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_fee_record(
        &self,
        row: Fee_Record,
    ) -> Result<UpsertOutcome, Error> {
        Ok(outcome(self.fee_record.upsert(&row).await?))
    }

    async fn get_fee_record(
        &self,
        market: &str,
        fee_type: &str,
    ) -> Result<Option<Fee_Record>, Error> {
        Ok(self.fee_record.get(market, fee_type).await?)
    }

    async fn upsert_pool_total(
        &self,
        row: Pool_Total,
    ) -> Result<UpsertOutcome, Error> {
        Ok(outcome(self.pool_total.upsert(&row).await?))
    }

    async fn get_pool_totals(
        &self,
        market: &str,
    ) -> Result<Vec<Pool_Total>, Error> {
        Ok(self.pool_total.get_by_market(market).await?)
    }

    async fn get_cursor(&self, feed: &str) -> Result<Option<u64>, Error> {
        match self.sync_cursor.get(feed).await? {
            Some(cursor) => Ok(Some(u64::try_from(cursor.SC_block)?)),
            None => Ok(None),
        }
    }

    async fn set_cursor(&self, feed: &str, block: u64) -> Result<(), Error> {
        let block = i64::try_from(block)?;
        Ok(self.sync_cursor.advance(feed, block, Utc::now()).await?)
    }

    async fn insert_action(&self, action: Action_History) -> Result<(), Error> {
        Ok(self.action_history.insert(&action).await?)
    }

    async fn get_last_action(
        &self,
        action_type: &str,
    ) -> Result<Option<Action_History>, Error> {
        Ok(self.action_history.get_last_by_type(action_type).await?)
    }
}
