use std::future::Future;

use alloy::primitives::{Address, U256};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{
    cache::cached_read,
    cache_keys,
    configuration::State,
    error::Error,
    helpers::{address_key, u256_to_u64},
    provider::read,
    types::{
        abi::{IMarketFactory, IPredictionMarket},
        FieldFailure, MarketSnapshot, SnapshotField,
    },
};

async fn read_field<T, F, Fut>(
    state: &State,
    market: Address,
    field: SnapshotField,
    load: F,
) -> Result<T, Error>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let key = cache_keys::snapshot_field(&market, field);
    cached_read(state.cache.as_ref(), &key, state.cache_ttl(), load).await
}

fn keep<T>(
    snapshot: &mut MarketSnapshot,
    field: SnapshotField,
    result: Result<T, Error>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                market = %address_key(&snapshot.address),
                field = %field,
                "field read failed: {}",
                e
            );
            snapshot.failures.push(FieldFailure::new(field, &e));
            None
        },
    }
}

/// Reads every field of one market independently. Never fails as a whole;
/// unreadable fields are left empty and listed in `failures`.
pub async fn fetch(
    state: &State,
    market: Address,
    factory_index: Option<u64>,
) -> MarketSnapshot {
    let chain = state.chain.as_ref();

    let (title, end_time, resolved, pools) = tokio::join!(
        read_field(state, market, SnapshotField::Title, || {
            read(chain, market, IPredictionMarket::titleCall {})
        }),
        read_field(state, market, SnapshotField::EndTime, || {
            read(chain, market, IPredictionMarket::endTimeCall {})
        }),
        read_field(state, market, SnapshotField::Resolved, || {
            read(chain, market, IPredictionMarket::resolvedCall {})
        }),
        fetch_pools(state, market, factory_index),
    );

    let mut snapshot = MarketSnapshot::new(market, factory_index);
    snapshot.title = keep(&mut snapshot, SnapshotField::Title, title);
    snapshot.end_time = keep(
        &mut snapshot,
        SnapshotField::EndTime,
        end_time.and_then(|value: U256| u256_to_u64(value, "endTime")),
    );
    snapshot.resolved = keep(&mut snapshot, SnapshotField::Resolved, resolved);
    snapshot.pool_totals =
        keep(&mut snapshot, SnapshotField::PoolTotals, pools);

    if snapshot.resolved == Some(true) {
        let field = SnapshotField::WinningOutcome;
        let winner = read_field(state, market, field, || {
            read(chain, market, IPredictionMarket::winningOutcomeCall {})
        })
        .await;
        snapshot.winning_outcome =
            keep(&mut snapshot, SnapshotField::WinningOutcome, winner);
    }

    debug!(
        market = %address_key(&market),
        failed = snapshot.failures.len(),
        "snapshot fetched"
    );

    snapshot
}

/// Per-outcome totals in base units: the market's own `getPoolTotals()`,
/// else the factory's `getPools(index)` when the index is known.
pub async fn fetch_pools(
    state: &State,
    market: Address,
    factory_index: Option<u64>,
) -> Result<Vec<U256>, Error> {
    let chain = state.chain.as_ref();

    let own = read_field(state, market, SnapshotField::PoolTotals, || {
        read(chain, market, IPredictionMarket::getPoolTotalsCall {})
    })
    .await;

    let (own_error, index) = match (own, factory_index) {
        (Ok(pools), _) => return Ok(pools),
        (Err(e), None) => return Err(e),
        (Err(e), Some(index)) => (e, index),
    };

    debug!(
        market = %address_key(&market),
        index,
        "getPoolTotals failed, trying factory getPools: {}",
        own_error
    );

    let factory = state.config.factory_address;
    cached_read(
        state.cache.as_ref(),
        &cache_keys::factory_pools(&factory, index),
        state.cache_ttl(),
        || {
            read(
                chain,
                factory,
                IMarketFactory::getPoolsCall {
                    marketIndex: U256::from(index),
                },
            )
        },
    )
    .await
}
