//! Consolidated database models
//!
//! Row structs mirror the tables in `migrations/` column for column.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::BigDecimal as SqlxBigDecimal, FromRow};

// =============================================================================
// MARKETS
// =============================================================================

/// Pool totals are kept in base units; display conversion happens on read.
#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Market_Snapshot {
    pub MS_id: i64,
    pub MS_address: String,
    pub MS_factory: String,
    pub MS_factory_index: Option<i64>,
    pub MS_title: String,
    pub MS_end_time: DateTime<Utc>,
    pub MS_resolved: bool,
    pub MS_winning_outcome: Option<i32>,
    pub MS_pool_totals: Vec<SqlxBigDecimal>,
    pub MS_last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Market_Ref {
    pub MS_address: String,
    pub MS_factory_index: Option<i64>,
}

// =============================================================================
// SETTLEMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Bet {
    pub Tx_Hash: String,
    pub BT_market_address: String,
    pub BT_wallet_address: String,
    pub BT_outcome_index: i32,
    pub BT_amount: SqlxBigDecimal,
    pub BT_block_number: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Payout {
    pub PO_market_address: String,
    pub PO_user_wallet: String,
    pub PO_outcome_index: i32,
    pub PO_amount: SqlxBigDecimal,
    pub Tx_Hash: String,
    pub PO_created_at: DateTime<Utc>,
}

// =============================================================================
// EVENT AGGREGATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Fee_Record {
    pub FR_market_address: String,
    pub FR_fee_type: String,
    pub FR_amount: SqlxBigDecimal,
    pub FR_collector: String,
    pub Tx_Hash: String,
    pub FR_block_number: i64,
    pub FR_log_index: i64,
    pub FR_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Deserialize, Serialize)]
pub struct Pool_Total {
    pub PT_market_address: String,
    pub PT_outcome_index: i32,
    pub PT_total: SqlxBigDecimal,
    pub Tx_Hash: String,
    pub PT_block_number: i64,
    pub PT_log_index: i64,
    pub PT_updated_at: DateTime<Utc>,
}

/// Whether an event-driven upsert changed the row or lost to a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Sync_Cursor {
    pub SC_feed: String,
    pub SC_block: i64,
    pub SC_updated_at: DateTime<Utc>,
}

// =============================================================================
// BOOKKEEPING
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct Action_History {
    pub action_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actions {
    ResyncAction,
    PoolResyncAction,
    EventAction,
    PurgeAction,
}

impl fmt::Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Actions::ResyncAction => write!(f, "0"),
            Actions::PoolResyncAction => write!(f, "1"),
            Actions::EventAction => write!(f, "2"),
            Actions::PurgeAction => write!(f, "3"),
        }
    }
}

/// Fee type recorded for `ProtocolFeeCollected`.
pub const PROTOCOL_FEE: &str = "protocol";
