use sqlx::{postgres::PgPoolOptions, PgPool};

pub type PoolType = PgPool;
pub type PoolOption = PgPoolOptions;

/// Postgres `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Postgres `foreign_key_violation`.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
