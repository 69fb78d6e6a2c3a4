pub use self::{
    memory::MemoryStore,
    postgre::{
        FOREIGN_KEY_VIOLATION, PoolOption, PoolType, UNIQUE_VIOLATION,
    },
    store::Store,
};

mod memory;
mod postgre;
mod store;
