use std::fmt;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    helpers::{
        address_key, timestamp_to_datetime, to_base_decimal, u256_to_i32,
    },
    model::Market_Snapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotField {
    Title,
    EndTime,
    Resolved,
    WinningOutcome,
    PoolTotals,
}

impl SnapshotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::Title => "title",
            SnapshotField::EndTime => "endTime",
            SnapshotField::Resolved => "resolved",
            SnapshotField::WinningOutcome => "winningOutcome",
            SnapshotField::PoolTotals => "poolTotals",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    pub field: SnapshotField,
    pub code: &'static str,
    pub reason: String,
}

impl FieldFailure {
    pub fn new(field: SnapshotField, error: &Error) -> Self {
        FieldFailure {
            field,
            code: error.code(),
            reason: error.to_string(),
        }
    }
}

/// A point-in-time read of one market contract. Every field is read
/// independently, so any subset may be missing; `failures` says why.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub address: Address,
    pub factory_index: Option<u64>,
    pub title: Option<String>,
    pub end_time: Option<u64>,
    pub resolved: Option<bool>,
    pub winning_outcome: Option<U256>,
    pub pool_totals: Option<Vec<U256>>,
    pub failures: Vec<FieldFailure>,
}

impl MarketSnapshot {
    pub fn new(address: Address, factory_index: Option<u64>) -> Self {
        MarketSnapshot {
            address,
            factory_index,
            ..Default::default()
        }
    }

    pub fn failed_fields(&self) -> Vec<SnapshotField> {
        self.failures.iter().map(|failure| failure.field).collect()
    }

    /// A winning outcome is only required once the market is resolved.
    pub fn is_complete(&self) -> bool {
        let winner_known = match self.resolved {
            Some(true) => self.winning_outcome.is_some(),
            Some(false) => true,
            None => false,
        };

        self.title.is_some()
            && self.end_time.is_some()
            && self.pool_totals.is_some()
            && winner_known
    }

    /// Builds the full replacement row. Incomplete snapshots are refused so
    /// the writer never patches a row field by field.
    pub fn into_row(
        self,
        factory: &Address,
        synced_at: DateTime<Utc>,
    ) -> Result<Market_Snapshot, Error> {
        if !self.is_complete() {
            let fields = self
                .failed_fields()
                .iter()
                .map(|field| field.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::DecodeError(format!(
                "incomplete snapshot for {}: {}",
                address_key(&self.address),
                fields
            )));
        }

        let (title, end_time, resolved, pools) = match (
            self.title,
            self.end_time,
            self.resolved,
            self.pool_totals,
        ) {
            (Some(title), Some(end_time), Some(resolved), Some(pools)) => {
                (title, end_time, resolved, pools)
            },
            _ => {
                return Err(Error::DecodeError(format!(
                    "incomplete snapshot for {}",
                    address_key(&self.address)
                )))
            },
        };

        let winning_outcome = match (resolved, self.winning_outcome) {
            (true, Some(outcome)) => {
                Some(u256_to_i32(outcome, "winningOutcome")?)
            },
            _ => None,
        };

        let pool_totals = pools
            .into_iter()
            .map(to_base_decimal)
            .collect::<Result<Vec<_>, Error>>()?;

        let factory_index = match self.factory_index {
            Some(index) => Some(i64::try_from(index)?),
            None => None,
        };

        Ok(Market_Snapshot {
            MS_id: 0,
            MS_address: address_key(&self.address),
            MS_factory: address_key(factory),
            MS_factory_index: factory_index,
            MS_title: title,
            MS_end_time: timestamp_to_datetime(end_time)?,
            MS_resolved: resolved,
            MS_winning_outcome: winning_outcome,
            MS_pool_totals: pool_totals,
            MS_last_synced_at: synced_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    fn open_market() -> MarketSnapshot {
        MarketSnapshot {
            address: Address::repeat_byte(0xaa),
            factory_index: Some(0),
            title: Some(String::from("Will ETH hit $5k?")),
            end_time: Some(1_735_689_600),
            resolved: Some(false),
            winning_outcome: None,
            pool_totals: Some(vec![
                U256::from(2_000_000_000_000_000_000u128),
                U256::from(1_000_000_000_000_000_000u128),
            ]),
            failures: vec![],
        }
    }

    #[test]
    fn complete_snapshot_becomes_row() {
        let synced_at = Utc::now();
        let row = open_market()
            .into_row(&Address::repeat_byte(0xfa), synced_at)
            .unwrap();

        assert_eq!(row.MS_address, address_key(&Address::repeat_byte(0xaa)));
        assert_eq!(row.MS_end_time.timestamp(), 1_735_689_600);
        assert_eq!(row.MS_winning_outcome, None);
        assert_eq!(
            row.MS_pool_totals[0],
            BigDecimal::from_str("2000000000000000000").unwrap()
        );
        assert_eq!(row.MS_last_synced_at, synced_at);
    }

    #[test]
    fn resolved_market_needs_a_winner() {
        let mut snapshot = open_market();
        snapshot.resolved = Some(true);
        assert!(!snapshot.is_complete());

        snapshot.winning_outcome = Some(U256::from(1u8));
        let row = snapshot
            .into_row(&Address::repeat_byte(0xfa), Utc::now())
            .unwrap();
        assert_eq!(row.MS_winning_outcome, Some(1));
    }

    #[test]
    fn partial_snapshot_is_refused() {
        let mut snapshot = open_market();
        snapshot.title = None;
        snapshot.failures.push(FieldFailure::new(
            SnapshotField::Title,
            &Error::DecodeError(String::from("execution reverted")),
        ));

        let err = snapshot
            .into_row(&Address::repeat_byte(0xfa), Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("title"));
    }
}
