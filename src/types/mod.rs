pub use self::{
    claim::{
        BetRequest, ClaimEligibility, ClaimRequest, IneligibleReason,
        RecordedBet, VerifiedClaim,
    },
    events::{EventFailure, EventKind, ProcessReport, ProcessRequest},
    report::{BatchReport, MarketFailure, SkippedIndex, SyncStatus},
    snapshot::{FieldFailure, MarketSnapshot, SnapshotField},
};

pub mod abi;
mod claim;
mod events;
mod report;
mod snapshot;
