pub use self::types::{
    FOREIGN_KEY_VIOLATION, PoolOption, PoolType, UNIQUE_VIOLATION,
};

mod action_history;
mod bet;
mod fee_record;
mod market_snapshot;
mod payout;
mod pool_total;
mod sync_cursor;
mod types;
