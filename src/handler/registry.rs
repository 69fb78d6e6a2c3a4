use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use futures::{stream, StreamExt};
use tracing::{info, warn};

use crate::{
    cache::cached_read,
    cache_keys,
    configuration::State,
    error::Error,
    helpers::{address_key, u256_to_u64},
    provider::read,
    types::{abi::IMarketFactory, SkippedIndex},
};

/// Markets known to the factory, keyed by address with the first factory
/// index each address was seen at.
#[derive(Debug, Default)]
pub struct Registry {
    pub markets: BTreeMap<Address, u64>,
    pub skipped: Vec<SkippedIndex>,
}

impl Registry {
    fn insert(&mut self, index: u64, address: Address) {
        if address == Address::ZERO {
            self.skipped.push(SkippedIndex {
                index,
                reason: String::from("zero address"),
            });
            return;
        }
        self.markets.entry(address).or_insert(index);
    }
}

/// Lists the factory's markets with `getAllMarkets()`, falling back to
/// `totalMarkets()` plus `allMarkets(i)`. Indices that fail in the fallback
/// are reported in `skipped`; only the failure of both strategies is an
/// error.
pub async fn enumerate(
    state: &State,
    factory: Address,
) -> Result<Registry, Error> {
    let ttl = state.cache_ttl();

    let full_list = cached_read(
        state.cache.as_ref(),
        &cache_keys::market_list(&factory),
        ttl,
        || {
            read(
                state.chain.as_ref(),
                factory,
                IMarketFactory::getAllMarketsCall {},
            )
        },
    )
    .await;

    match full_list {
        Ok(addresses) => {
            let mut registry = Registry::default();
            for (index, address) in addresses.into_iter().enumerate() {
                registry.insert(u64::try_from(index)?, address);
            }
            info!(
                factory = %address_key(&factory),
                markets = registry.markets.len(),
                "enumerated markets with getAllMarkets"
            );
            return Ok(registry);
        },
        Err(e) => {
            warn!(
                factory = %address_key(&factory),
                "getAllMarkets failed, falling back to indexed scan: {}",
                e
            );
        },
    }

    enumerate_indexed(state, factory).await
}

async fn enumerate_indexed(
    state: &State,
    factory: Address,
) -> Result<Registry, Error> {
    let ttl = state.cache_ttl();

    let total: U256 = cached_read(
        state.cache.as_ref(),
        &cache_keys::market_count(&factory),
        ttl,
        || {
            read(
                state.chain.as_ref(),
                factory,
                IMarketFactory::totalMarketsCall {},
            )
        },
    )
    .await?;
    let total = u256_to_u64(total, "totalMarkets")?;

    let results: Vec<(u64, Result<Address, Error>)> = stream::iter(0..total)
        .map(|index| async move {
            let address = market_at(state, factory, index).await;
            (index, address)
        })
        .buffer_unordered(state.config.sync_concurrency)
        .collect()
        .await;

    let mut registry = Registry::default();
    for (index, result) in results {
        match result {
            Ok(address) => registry.insert(index, address),
            Err(e) => {
                warn!(
                    factory = %address_key(&factory),
                    index,
                    "allMarkets failed: {}",
                    e
                );
                registry.skipped.push(SkippedIndex {
                    index,
                    reason: e.to_string(),
                });
            },
        }
    }
    registry.skipped.sort_by_key(|item| item.index);

    info!(
        factory = %address_key(&factory),
        total,
        markets = registry.markets.len(),
        skipped = registry.skipped.len(),
        "enumerated markets by index"
    );

    Ok(registry)
}

/// `allMarkets(index)`, cached. Also used to attribute factory fee events.
pub async fn market_at(
    state: &State,
    factory: Address,
    index: u64,
) -> Result<Address, Error> {
    cached_read(
        state.cache.as_ref(),
        &cache_keys::market_at(&factory, index),
        state.cache_ttl(),
        || {
            read(
                state.chain.as_ref(),
                factory,
                IMarketFactory::allMarketsCall {
                    index: U256::from(index),
                },
            )
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::sol_types::SolValue;

    use super::*;
    use crate::provider::mock::{test_state, MockChain, Reply};

    fn factory() -> Address {
        crate::configuration::test_config().factory_address
    }

    #[tokio::test]
    async fn full_list_is_deduplicated() {
        let chain = Arc::new(MockChain::new());
        let a = Address::repeat_byte(0x0a);
        let b = Address::repeat_byte(0x0b);
        chain.returns(
            factory(),
            &IMarketFactory::getAllMarketsCall {},
            (vec![a, b, a, Address::ZERO],).abi_encode_params(),
        );
        let (state, _) = test_state(chain.clone());

        let registry = enumerate(&state, factory()).await.unwrap();

        assert_eq!(registry.markets.len(), 2);
        assert_eq!(registry.markets[&a], 0);
        assert_eq!(registry.markets[&b], 1);
        assert_eq!(registry.skipped.len(), 1);
        assert_eq!(registry.skipped[0].index, 3);
    }

    #[tokio::test]
    async fn indexed_fallback_skips_failed_indices() {
        let chain = Arc::new(MockChain::new());
        chain.returns(
            factory(),
            &IMarketFactory::totalMarketsCall {},
            (U256::from(4u8),).abi_encode_params(),
        );
        for index in [0u8, 1, 3] {
            chain.returns(
                factory(),
                &IMarketFactory::allMarketsCall {
                    index: U256::from(index),
                },
                (Address::repeat_byte(index + 1),).abi_encode_params(),
            );
        }
        chain.on_call(
            factory(),
            &IMarketFactory::allMarketsCall {
                index: U256::from(2u8),
            },
            Reply::Down,
        );
        let (state, _) = test_state(chain.clone());

        let registry = enumerate(&state, factory()).await.unwrap();

        assert_eq!(registry.markets.len(), 3);
        assert_eq!(registry.markets[&Address::repeat_byte(4)], 3);
        assert_eq!(registry.skipped.len(), 1);
        assert_eq!(registry.skipped[0].index, 2);
    }

    #[tokio::test]
    async fn both_strategies_failing_is_an_error() {
        let chain = Arc::new(MockChain::new());
        let (state, _) = test_state(chain);

        let result = enumerate(&state, factory()).await;
        assert!(matches!(result, Err(Error::DecodeError(_))));
    }

    #[tokio::test]
    async fn repeated_enumeration_is_served_from_cache() {
        let chain = Arc::new(MockChain::new());
        chain.returns(
            factory(),
            &IMarketFactory::getAllMarketsCall {},
            (vec![Address::repeat_byte(0x0a)],).abi_encode_params(),
        );
        let (state, _) = test_state(chain.clone());

        enumerate(&state, factory()).await.unwrap();
        chain.set_down(true);
        let registry = enumerate(&state, factory()).await.unwrap();

        assert_eq!(registry.markets.len(), 1);
        assert_eq!(chain.call_count(), 1);
    }
}
