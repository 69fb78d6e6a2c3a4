use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::SnapshotField;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFailure {
    pub address: String,
    pub code: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SnapshotField>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedIndex {
    pub index: u64,
    pub reason: String,
}

/// Outcome of a batch flow. Failed markets are reported, never fatal.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub synced: Vec<String>,
    pub failed: Vec<MarketFailure>,
    pub skipped_indices: Vec<SkippedIndex>,
}

impl BatchReport {
    pub fn sort(&mut self) {
        self.synced.sort();
        self.failed.sort_by(|a, b| a.address.cmp(&b.address));
        self.skipped_indices.sort_by_key(|item| item.index);
    }
}

/// When each batch flow last completed, `None` if it never has.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_resync: Option<DateTime<Utc>>,
    pub last_pool_resync: Option<DateTime<Utc>>,
    pub last_event_replay: Option<DateTime<Utc>>,
    pub last_purge: Option<DateTime<Utc>>,
}
