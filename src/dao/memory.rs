use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

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

use super::Store;

#[derive(Default)]
struct Tables {
    next_id: i64,
    markets: BTreeMap<String, Market_Snapshot>,
    bets: BTreeMap<String, Bet>,
    payouts: HashMap<(String, String), Payout>,
    fees: HashMap<(String, String), Fee_Record>,
    pools: BTreeMap<(String, i32), Pool_Total>,
    cursors: HashMap<String, u64>,
    actions: Vec<Action_History>,
}

/// Process-local store with the same uniqueness and ordering rules as the
/// Postgres schema. Used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables.lock().map_err(|e| {
            Error::ServerError(format!("memory store poisoned: {}", e))
        })
    }

    pub fn markets(&self) -> Result<Vec<Market_Snapshot>, Error> {
        Ok(self.tables()?.markets.values().cloned().collect())
    }

    pub fn payouts(&self) -> Result<Vec<Payout>, Error> {
        Ok(self.tables()?.payouts.values().cloned().collect())
    }

    pub fn bet_count(&self) -> Result<usize, Error> {
        Ok(self.tables()?.bets.len())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_market(
        &self,
        mut row: Market_Snapshot,
    ) -> Result<(), Error> {
        let mut tables = self.tables()?;

        row.MS_id = match tables.markets.get(&row.MS_address) {
            Some(existing) => existing.MS_id,
            None => {
                tables.next_id += 1;
                tables.next_id
            },
        };
        tables.markets.insert(row.MS_address.clone(), row);

        Ok(())
    }

    async fn update_market_pools(
        &self,
        address: &str,
        pools: Vec<BigDecimal>,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let mut tables = self.tables()?;

        match tables.markets.get_mut(address) {
            Some(market) => {
                market.MS_pool_totals = pools;
                market.MS_last_synced_at = synced_at;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn get_market_by_address(
        &self,
        address: &str,
    ) -> Result<Option<Market_Snapshot>, Error> {
        Ok(self.tables()?.markets.get(address).cloned())
    }

    async fn get_market_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Market_Snapshot>, Error> {
        Ok(self
            .tables()?
            .markets
            .values()
            .find(|market| market.MS_id == id)
            .cloned())
    }

    async fn list_markets(&self) -> Result<Vec<Market_Ref>, Error> {
        let tables = self.tables()?;
        let mut markets: Vec<&Market_Snapshot> =
            tables.markets.values().collect();
        markets.sort_by_key(|market| market.MS_id);

        Ok(markets
            .into_iter()
            .map(|market| Market_Ref {
                MS_address: market.MS_address.clone(),
                MS_factory_index: market.MS_factory_index,
            })
            .collect())
    }

    async fn purge_foreign_markets(&self, factory: &str) -> Result<u64, Error> {
        let mut tables = self.tables()?;

        let foreign: Vec<String> = tables
            .markets
            .values()
            .filter(|market| market.MS_factory != factory)
            .map(|market| market.MS_address.clone())
            .collect();

        for address in &foreign {
            tables.markets.remove(address);
        }
        tables
            .bets
            .retain(|_, bet| !foreign.contains(&bet.BT_market_address));

        Ok(u64::try_from(foreign.len())?)
    }

    async fn insert_bet(&self, bet: Bet) -> Result<bool, Error> {
        let mut tables = self.tables()?;

        if !tables.markets.contains_key(&bet.BT_market_address) {
            return Err(Error::MarketNotFound(bet.BT_market_address));
        }

        if tables.bets.contains_key(&bet.Tx_Hash) {
            return Ok(false);
        }
        tables.bets.insert(bet.Tx_Hash.clone(), bet);

        Ok(true)
    }

    async fn get_bets(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Vec<Bet>, Error> {
        let mut bets: Vec<Bet> = self
            .tables()?
            .bets
            .values()
            .filter(|bet| {
                bet.BT_market_address == market
                    && bet.BT_wallet_address == wallet
            })
            .cloned()
            .collect();
        bets.sort_by_key(|bet| bet.BT_block_number);

        Ok(bets)
    }

    async fn get_payout(
        &self,
        market: &str,
        wallet: &str,
    ) -> Result<Option<Payout>, Error> {
        let key = (market.to_string(), wallet.to_string());
        Ok(self.tables()?.payouts.get(&key).cloned())
    }

    async fn insert_payout(&self, payout: Payout) -> Result<(), Error> {
        let mut tables = self.tables()?;
        let key = (
            payout.PO_market_address.clone(),
            payout.PO_user_wallet.clone(),
        );

        if tables.payouts.contains_key(&key) {
            return Err(Error::StoreConflict(format!(
                "payout exists for market {} wallet {}",
                key.0, key.1
            )));
        }
        tables.payouts.insert(key, payout);

        Ok(())
    }

    async fn upsert_fee_record(
        &self,
        row: Fee_Record,
    ) -> Result<UpsertOutcome, Error> {
        let mut tables = self.tables()?;
        let key = (row.FR_market_address.clone(), row.FR_fee_type.clone());

        if let Some(existing) = tables.fees.get(&key) {
            if (existing.FR_block_number, existing.FR_log_index)
                > (row.FR_block_number, row.FR_log_index)
            {
                return Ok(UpsertOutcome::Stale);
            }
        }
        tables.fees.insert(key, row);

        Ok(UpsertOutcome::Applied)
    }

    async fn get_fee_record(
        &self,
        market: &str,
        fee_type: &str,
    ) -> Result<Option<Fee_Record>, Error> {
        let key = (market.to_string(), fee_type.to_string());
        Ok(self.tables()?.fees.get(&key).cloned())
    }

    async fn upsert_pool_total(
        &self,
        row: Pool_Total,
    ) -> Result<UpsertOutcome, Error> {
        let mut tables = self.tables()?;
        let key = (row.PT_market_address.clone(), row.PT_outcome_index);

        if let Some(existing) = tables.pools.get(&key) {
            if (existing.PT_block_number, existing.PT_log_index)
                > (row.PT_block_number, row.PT_log_index)
            {
                return Ok(UpsertOutcome::Stale);
            }
        }
        tables.pools.insert(key, row);

        Ok(UpsertOutcome::Applied)
    }

    async fn get_pool_totals(
        &self,
        market: &str,
    ) -> Result<Vec<Pool_Total>, Error> {
        Ok(self
            .tables()?
            .pools
            .values()
            .filter(|pool| pool.PT_market_address == market)
            .cloned()
            .collect())
    }

    async fn get_cursor(&self, feed: &str) -> Result<Option<u64>, Error> {
        Ok(self.tables()?.cursors.get(feed).copied())
    }

    async fn set_cursor(&self, feed: &str, block: u64) -> Result<(), Error> {
        let mut tables = self.tables()?;
        let cursor = tables.cursors.entry(feed.to_string()).or_insert(block);
        *cursor = (*cursor).max(block);

        Ok(())
    }

    async fn insert_action(&self, action: Action_History) -> Result<(), Error> {
        self.tables()?.actions.push(action);
        Ok(())
    }

    async fn get_last_action(
        &self,
        action_type: &str,
    ) -> Result<Option<Action_History>, Error> {
        Ok(self
            .tables()?
            .actions
            .iter()
            .filter(|action| action.action_type == action_type)
            .max_by_key(|action| action.created_at)
            .cloned())
    }
}
