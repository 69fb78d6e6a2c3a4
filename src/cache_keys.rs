//! Centralized cache key builders
//!
//! Every key the read cache sees is built here so the fetchers and the
//! registry cannot drift apart on naming.

use alloy::primitives::Address;

use crate::{helpers::address_key, types::SnapshotField};

pub const REGISTRY: &str = "registry";
pub const SNAPSHOT: &str = "snapshot";

pub fn market_list(factory: &Address) -> String {
    format!("{}:{}:all", REGISTRY, address_key(factory))
}

pub fn market_count(factory: &Address) -> String {
    format!("{}:{}:count", REGISTRY, address_key(factory))
}

pub fn market_at(factory: &Address, index: u64) -> String {
    format!("{}:{}:at:{}", REGISTRY, address_key(factory), index)
}

pub fn factory_pools(factory: &Address, index: u64) -> String {
    format!("{}:{}:pools:{}", REGISTRY, address_key(factory), index)
}

pub fn snapshot_field(market: &Address, field: SnapshotField) -> String {
    format!("{}:{}:{}", SNAPSHOT, address_key(market), field)
}
