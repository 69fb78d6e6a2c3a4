pub use self::{
    chain::{
        decode_log, logs_in_range, read, AlloyChain, ChainLog, ChainReader,
        ChainReceipt, LogFilter, RetryPolicy,
    },
    database::DatabasePool,
    event::{EventFeed, LogPage},
};

mod chain;
mod database;
mod event;
#[cfg(test)]
pub(crate) mod mock;
