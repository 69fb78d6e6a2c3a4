//! HTTP trigger surface. One module per trigger, all JSON in and out.

pub mod bets;
pub mod claims;
pub mod events;
pub mod purge;
pub mod resync;
pub mod status;
pub mod version;
