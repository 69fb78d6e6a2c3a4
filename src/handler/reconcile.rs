use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use tracing::{info, warn};

use crate::{
    configuration::State,
    error::Error,
    handler::{market_snapshot, registry},
    helpers::{address_key, parse_address, to_base_decimal},
    model::{Action_History, Actions},
    types::{BatchReport, MarketFailure, MarketSnapshot, SyncStatus},
};

/// Writes one snapshot as a full-row replace. Incomplete snapshots are
/// refused rather than merged into the stored row.
pub async fn upsert_snapshot(
    state: &State,
    snapshot: MarketSnapshot,
) -> Result<(), Error> {
    let row = snapshot.into_row(&state.config.factory_address, Utc::now())?;
    state.store.upsert_market(row).await
}

async fn sync_market(
    state: &State,
    address: Address,
    index: u64,
) -> Result<(), MarketFailure> {
    let snapshot = market_snapshot::fetch(state, address, Some(index)).await;
    let fields = snapshot.failed_fields();

    upsert_snapshot(state, snapshot).await.map_err(|e| {
        warn!(market = %address_key(&address), "market skipped: {}", e);
        MarketFailure {
            address: address_key(&address),
            code: e.code(),
            reason: e.to_string(),
            fields,
        }
    })
}

pub async fn record_action(
    state: &State,
    action: Actions,
) -> Result<(), Error> {
    state
        .store
        .insert_action(Action_History {
            action_type: action.to_string(),
            created_at: Utc::now(),
        })
        .await
}

/// Enumerates the factory and mirrors every market. A market that cannot
/// be read or written is reported and the batch continues.
pub async fn resync_all(state: &State) -> Result<BatchReport, Error> {
    let factory = state.config.factory_address;
    let registry = registry::enumerate(state, factory).await?;

    let mut report = BatchReport {
        skipped_indices: registry.skipped,
        ..Default::default()
    };

    let results: Vec<(Address, Result<(), MarketFailure>)> =
        stream::iter(registry.markets)
            .map(|(address, index)| async move {
                (address, sync_market(state, address, index).await)
            })
            .buffer_unordered(state.config.sync_concurrency)
            .collect()
            .await;

    for (address, result) in results {
        match result {
            Ok(()) => report.synced.push(address_key(&address)),
            Err(failure) => report.failed.push(failure),
        }
    }
    report.sort();

    record_action(state, Actions::ResyncAction).await?;

    info!(
        synced = report.synced.len(),
        failed = report.failed.len(),
        skipped = report.skipped_indices.len(),
        "full resync finished"
    );

    Ok(report)
}

async fn sync_pools(
    state: &State,
    address: &str,
    index: Option<i64>,
) -> Result<(), Error> {
    let market = parse_address(address)?;
    let index = match index {
        Some(index) => Some(u64::try_from(index)?),
        None => None,
    };

    let pools = market_snapshot::fetch_pools(state, market, index)
        .await?
        .into_iter()
        .map(to_base_decimal)
        .collect::<Result<Vec<_>, Error>>()?;

    let updated = state
        .store
        .update_market_pools(address, pools, Utc::now())
        .await?;
    if !updated {
        return Err(Error::MarketNotFound(address.to_string()));
    }

    Ok(())
}

/// Refreshes only the pool totals of markets already mirrored.
pub async fn resync_pools(state: &State) -> Result<BatchReport, Error> {
    let markets = state.store.list_markets().await?;

    let results: Vec<(String, Result<(), Error>)> = stream::iter(markets)
        .map(|market| async move {
            let result =
                sync_pools(state, &market.MS_address, market.MS_factory_index)
                    .await;
            (market.MS_address, result)
        })
        .buffer_unordered(state.config.sync_concurrency)
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (address, result) in results {
        match result {
            Ok(()) => report.synced.push(address),
            Err(e) => {
                warn!(market = %address, "pool refresh skipped: {}", e);
                report.failed.push(MarketFailure {
                    address,
                    code: e.code(),
                    reason: e.to_string(),
                    fields: vec![],
                });
            },
        }
    }
    report.sort();

    record_action(state, Actions::PoolResyncAction).await?;

    info!(
        synced = report.synced.len(),
        failed = report.failed.len(),
        "pool resync finished"
    );

    Ok(report)
}

/// Drops markets recorded under a factory other than the configured one.
pub async fn purge_foreign_markets(state: &State) -> Result<u64, Error> {
    let factory = address_key(&state.config.factory_address);
    let removed = state.store.purge_foreign_markets(&factory).await?;

    record_action(state, Actions::PurgeAction).await?;
    info!(factory = %factory, removed, "purged foreign markets");

    Ok(removed)
}

async fn last_run(
    state: &State,
    action: Actions,
) -> Result<Option<DateTime<Utc>>, Error> {
    let last = state.store.get_last_action(&action.to_string()).await?;
    Ok(last.map(|item| item.created_at))
}

/// Completion time of the latest run of every batch flow.
pub async fn sync_status(state: &State) -> Result<SyncStatus, Error> {
    Ok(SyncStatus {
        last_resync: last_run(state, Actions::ResyncAction).await?,
        last_pool_resync: last_run(state, Actions::PoolResyncAction).await?,
        last_event_replay: last_run(state, Actions::EventAction).await?,
        last_purge: last_run(state, Actions::PurgeAction).await?,
    })
}

#[cfg(test)]
mod tests {
    use std::{str::FromStr, sync::Arc};

    use alloy::{primitives::U256, sol_types::SolValue};
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::{
        dao::{MemoryStore, Store},
        handler::market_snapshot::tests::script_market,
        helpers::display_pool_sum,
        provider::mock::{test_state, MockChain},
        types::{abi::IMarketFactory, SnapshotField},
    };

    fn factory() -> Address {
        crate::configuration::test_config().factory_address
    }

    fn list_markets(chain: &MockChain, markets: &[Address]) {
        chain.returns(
            factory(),
            &IMarketFactory::getAllMarketsCall {},
            (markets.to_vec(),).abi_encode_params(),
        );
    }

    #[tokio::test]
    async fn resync_mirrors_pool_totals_exactly() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(0x0a);
        let b = Address::repeat_byte(0x0b);
        list_markets(&chain, &[a, b]);
        script_market(
            &chain,
            a,
            "Will ETH hit $5k?",
            1_735_689_600,
            None,
            &[2_000_000_000_000_000_000, 1_000_000_000_000_000_000],
        );
        script_market(&chain, b, "Other", 1_735_689_600, None, &[0, 0]);
        let (state, store) = test_state(chain);

        let report = resync_all(&state).await.unwrap();
        assert_eq!(report.synced.len(), 2);
        assert!(report.failed.is_empty());

        let row = store
            .get_market_by_address(&address_key(&a))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.MS_title, "Will ETH hit $5k?");
        assert!(!row.MS_resolved);
        assert_eq!(row.MS_end_time.timestamp(), 1_735_689_600);
        assert_eq!(
            display_pool_sum(&row.MS_pool_totals).unwrap(),
            BigDecimal::from_str("3.0").unwrap()
        );
    }

    #[tokio::test]
    async fn one_bad_market_does_not_abort_the_batch() {
        let chain = Arc::new(MockChain::new());
        let markets: Vec<Address> =
            (1u8..=5).map(Address::repeat_byte).collect();
        list_markets(&chain, &markets);
        for (i, market) in markets.iter().enumerate() {
            if i == 2 {
                continue;
            }
            script_market(&chain, *market, "ok", 100, None, &[1, 2]);
        }
        let (state, store) = test_state(chain);

        let report = resync_all(&state).await.unwrap();

        assert_eq!(report.synced.len(), 4);
        assert_eq!(report.failed.len(), 1);
        let failure = &report.failed[0];
        assert_eq!(failure.address, address_key(&markets[2]));
        assert_eq!(failure.code, "decode_error");
        assert!(failure.fields.contains(&SnapshotField::Title));
        assert_eq!(store.markets().unwrap().len(), 4);
        let status = sync_status(&state).await.unwrap();
        assert!(status.last_resync.is_some());
        assert!(status.last_pool_resync.is_none());
        assert!(status.last_purge.is_none());
    }

    #[tokio::test]
    async fn applying_the_same_market_twice_keeps_one_row() {
        let chain = Arc::new(MockChain::new());
        let (state, store) = test_state(chain);
        let market = Address::repeat_byte(0x0a);

        let mut first = MarketSnapshot::new(market, Some(0));
        first.title = Some(String::from("before"));
        first.end_time = Some(100);
        first.resolved = Some(false);
        first.pool_totals = Some(vec![U256::from(1u8)]);

        let mut second = first.clone();
        second.title = Some(String::from("after"));
        second.resolved = Some(true);
        second.winning_outcome = Some(U256::ZERO);
        second.pool_totals = Some(vec![U256::from(4u8), U256::from(5u8)]);

        upsert_snapshot(&state, first).await.unwrap();
        upsert_snapshot(&state, second).await.unwrap();

        let rows = store.markets().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].MS_title, "after");
        assert_eq!(rows[0].MS_winning_outcome, Some(0));
        assert_eq!(
            rows[0].MS_pool_totals,
            vec![BigDecimal::from(4), BigDecimal::from(5)]
        );
    }

    #[tokio::test]
    async fn overlapping_resyncs_converge() {
        let chain = Arc::new(MockChain::new());
        let markets: Vec<Address> =
            (1u8..=3).map(Address::repeat_byte).collect();
        list_markets(&chain, &markets);
        for market in &markets {
            script_market(&chain, *market, "same", 100, Some(1), &[3, 4]);
        }
        let (state, store) = test_state(chain);

        let (left, right) =
            tokio::join!(resync_all(&state), resync_all(&state));
        assert_eq!(left.unwrap().synced.len(), 3);
        assert_eq!(right.unwrap().synced.len(), 3);

        let rows = store.markets().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.MS_winning_outcome == Some(1)));
    }

    #[tokio::test]
    async fn pool_resync_touches_only_pools() {
        let chain = Arc::new(MockChain::new());
        let market = Address::repeat_byte(0x0a);
        list_markets(&chain, &[market]);
        script_market(&chain, market, "title", 100, None, &[1, 1]);
        let (state, store) = test_state(chain.clone());
        resync_all(&state).await.unwrap();

        // Fresh state so the cached pools are not served.
        let store_ref: Arc<MemoryStore> = store.clone();
        let state = crate::configuration::State::new(
            crate::configuration::test_config(),
            chain.clone(),
            store_ref,
            Arc::new(crate::cache::MemoryCache::new()),
        );
        script_market(&chain, market, "renamed", 100, None, &[6, 1]);

        let report = resync_pools(&state).await.unwrap();
        assert_eq!(report.synced, vec![address_key(&market)]);

        let row = store
            .get_market_by_address(&address_key(&market))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.MS_title, "title");
        assert_eq!(
            row.MS_pool_totals,
            vec![BigDecimal::from(6), BigDecimal::from(1)]
        );
    }

    #[tokio::test]
    async fn purge_keeps_only_current_factory_markets() {
        let chain = Arc::new(MockChain::new());
        let (state, store) = test_state(chain);

        let mut ours = MarketSnapshot::new(Address::repeat_byte(0x0a), None);
        ours.title = Some(String::from("ours"));
        ours.end_time = Some(1);
        ours.resolved = Some(false);
        ours.pool_totals = Some(vec![]);
        upsert_snapshot(&state, ours.clone()).await.unwrap();

        let mut foreign = ours
            .into_row(&Address::repeat_byte(0xee), Utc::now())
            .unwrap();
        foreign.MS_address = address_key(&Address::repeat_byte(0x0b));
        store.upsert_market(foreign).await.unwrap();

        assert_eq!(purge_foreign_markets(&state).await.unwrap(), 1);
        assert_eq!(store.markets().unwrap().len(), 1);
    }
}
