pub mod bet;
pub mod claim;
pub mod event_processor;
pub mod market_snapshot;
pub mod receipt;
pub mod reconcile;
pub mod registry;
