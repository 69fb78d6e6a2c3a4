//! Database models module
//!
//! All row structs live in models.rs, the generic table handle in table.rs.

mod models;
mod table;

pub use models::*;

pub use table::Table;
