//! Scripted chain for tests. Calls are keyed by target and calldata;
//! anything unscripted reverts like a contract without that method.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use alloy::{
    primitives::{Address, Bytes, B256},
    sol_types::{SolCall, SolEvent},
};
use async_trait::async_trait;

use crate::{
    cache::MemoryCache,
    configuration::{test_config, State},
    dao::MemoryStore,
    error::Error,
};

use super::{ChainLog, ChainReader, ChainReceipt, LogFilter};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Bytes),
    Down,
}

#[derive(Default)]
struct Script {
    calls: HashMap<(Address, Bytes), Reply>,
    logs: Vec<ChainLog>,
    max_log_range: Option<u64>,
    receipts: HashMap<B256, ChainReceipt>,
    pending: HashSet<B256>,
    block_number: u64,
    down: bool,
    call_count: usize,
    log_requests: Vec<(u64, u64)>,
}

#[derive(Default)]
pub struct MockChain {
    script: Mutex<Script>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn on_call<C: SolCall>(&self, to: Address, call: &C, reply: Reply) {
        self.script()
            .calls
            .insert((to, Bytes::from(call.abi_encode())), reply);
    }

    /// `output` is the encoded return, e.g. `(value,).abi_encode_params()`.
    pub fn returns<C: SolCall>(&self, to: Address, call: &C, output: Vec<u8>) {
        self.on_call(to, call, Reply::Ok(Bytes::from(output)));
    }

    pub fn push_log(&self, log: ChainLog) {
        self.script().logs.push(log);
    }

    pub fn set_max_log_range(&self, range: Option<u64>) {
        self.script().max_log_range = range;
    }

    pub fn set_receipt(&self, receipt: ChainReceipt) {
        self.script().receipts.insert(receipt.tx_hash, receipt);
    }

    pub fn set_pending(&self, hash: B256) {
        self.script().pending.insert(hash);
    }

    pub fn set_block_number(&self, block: u64) {
        self.script().block_number = block;
    }

    pub fn set_down(&self, down: bool) {
        self.script().down = down;
    }

    pub fn call_count(&self) -> usize {
        self.script().call_count
    }

    pub fn log_requests(&self) -> Vec<(u64, u64)> {
        self.script().log_requests.clone()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, Error> {
        let mut script = self.script();
        script.call_count += 1;
        if script.down {
            return Err(Error::ChainUnavailable(String::from("node down")));
        }

        match script.calls.get(&(to, data)) {
            Some(Reply::Ok(output)) => Ok(output.clone()),
            Some(Reply::Down) => {
                Err(Error::ChainUnavailable(String::from("connection refused")))
            },
            None => {
                Err(Error::DecodeError(String::from("execution reverted")))
            },
        }
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let script = self.script();
        if script.down {
            return Err(Error::ChainUnavailable(String::from("node down")));
        }
        Ok(script.block_number)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, Error> {
        let mut script = self.script();
        script
            .log_requests
            .push((filter.from_block, filter.to_block));
        if script.down {
            return Err(Error::ChainUnavailable(String::from("node down")));
        }

        let size = filter.to_block - filter.from_block + 1;
        if script.max_log_range.is_some_and(|max| size > max) {
            return Err(Error::DecodeError(String::from(
                "query exceeds max block range",
            )));
        }

        Ok(script
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<ChainReceipt>, Error> {
        let script = self.script();
        if script.down {
            return Err(Error::ChainUnavailable(String::from("node down")));
        }
        Ok(script.receipts.get(&hash).cloned())
    }

    async fn transaction_pending(&self, hash: B256) -> Result<bool, Error> {
        Ok(self.script().pending.contains(&hash))
    }
}

pub fn event_log<E: SolEvent>(
    address: Address,
    event: &E,
    block_number: u64,
    log_index: u64,
    tx_hash: B256,
) -> ChainLog {
    let data = event.encode_log_data();

    ChainLog {
        address,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
        block_number,
        log_index,
        tx_hash,
    }
}

pub fn receipt(
    tx_hash: B256,
    block_number: u64,
    logs: Vec<ChainLog>,
) -> ChainReceipt {
    ChainReceipt {
        tx_hash,
        success: true,
        block_number: Some(block_number),
        logs,
    }
}

/// State over the scripted chain, an empty memory store and memory cache.
pub fn test_state(chain: Arc<MockChain>) -> (State, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = State::new(
        test_config(),
        chain,
        store.clone(),
        Arc::new(MemoryCache::new()),
    );
    (state, store)
}
