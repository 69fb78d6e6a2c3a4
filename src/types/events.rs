use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    FeeCollected,
    PoolUpdated,
    BetPlaced,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FeeCollected => "fee-collected",
            EventKind::PoolUpdated => "pool-updated",
            EventKind::BetPlaced => "bet-placed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<EventKind, Self::Err> {
        match value {
            "fee-collected" => Ok(EventKind::FeeCollected),
            "pool-updated" => Ok(EventKind::PoolUpdated),
            "bet-placed" => Ok(EventKind::BetPlaced),
            _ => Err(Error::InvalidInput(format!(
                "event kind not supported: {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub kind: EventKind,
    /// One market, or every mirrored market when absent.
    pub market: Option<String>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFailure {
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub kind: EventKind,
    pub cursor_name: String,
    pub from_block: u64,
    pub to_block: u64,
    pub events_seen: u64,
    pub rows_applied: u64,
    pub stale_skipped: u64,
    pub failed: Vec<EventFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_through_names() {
        for kind in [
            EventKind::FeeCollected,
            EventKind::PoolUpdated,
            EventKind::BetPlaced,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("transfer".parse::<EventKind>().is_err());
    }
}
