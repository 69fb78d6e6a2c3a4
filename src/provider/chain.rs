use std::{future::Future, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, B256},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log, TransactionRequest},
    sol_types::{SolCall, SolEvent},
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use url::Url;

use crate::{configuration::Config, error::Error, helpers::address_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

impl ChainLog {
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }

    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub tx_hash: B256,
    pub success: bool,
    /// `None` while the node reports the receipt without inclusion data.
    pub block_number: Option<u64>,
    pub logs: Vec<ChainLog>,
}

/// Inclusive block range over a set of emitters and topic0 values. Empty
/// sets match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<Address>,
    pub topics: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    pub fn new(addresses: Vec<Address>, topics: Vec<B256>) -> Self {
        LogFilter {
            addresses,
            topics,
            from_block: 0,
            to_block: 0,
        }
    }

    pub fn range(&self, from_block: u64, to_block: u64) -> Self {
        LogFilter {
            from_block,
            to_block,
            ..self.clone()
        }
    }

    pub fn matches(&self, log: &ChainLog) -> bool {
        let address = self.addresses.is_empty()
            || self.addresses.contains(&log.address);
        let topic = self.topics.is_empty()
            || log.topic0().is_some_and(|t| self.topics.contains(&t));

        address
            && topic
            && log.block_number >= self.from_block
            && log.block_number <= self.to_block
    }
}

/// Read-only access to a JSON-RPC node. Implementations retry transient
/// failures themselves; callers only see `ChainUnavailable` once the retry
/// budget is spent.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, Error>;

    async fn block_number(&self) -> Result<u64, Error>;

    /// One `eth_getLogs` request; no range splitting.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, Error>;

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<ChainReceipt>, Error>;

    /// True when the node knows the transaction but has no receipt yet.
    async fn transaction_pending(&self, hash: B256) -> Result<bool, Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Runs `op` under the timeout, retrying retryable failures with a
    /// doubling backoff up to `max_retries` extra attempts.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let result = match timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(Error::ChainUnavailable(format!(
                    "{} timed out after {}ms",
                    label,
                    self.timeout.as_millis()
                ))),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "chain call failed, retrying: {}",
                        e
                    );
                    sleep(delay).await;
                },
                result => return result,
            }
        }
    }
}

pub struct AlloyChain {
    provider: RootProvider,
    policy: RetryPolicy,
}

impl AlloyChain {
    pub fn new(config: &Config) -> Result<AlloyChain, Error> {
        let url: Url = config.rpc_url.parse()?;

        Ok(AlloyChain {
            provider: RootProvider::new_http(url),
            policy: config.retry_policy(),
        })
    }
}

fn map_rpc_error(error: RpcError<TransportErrorKind>) -> Error {
    match error {
        RpcError::ErrorResp(payload) => Error::DecodeError(payload.to_string()),
        RpcError::DeserError { err, .. } => Error::DecodeError(err.to_string()),
        other => Error::ChainUnavailable(other.to_string()),
    }
}

fn convert_log(log: &Log) -> Result<ChainLog, Error> {
    let missing = |field: &str| {
        Error::DecodeError(format!("log without {} from node", field))
    };

    Ok(ChainLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number.ok_or_else(|| missing("block number"))?,
        log_index: log.log_index.ok_or_else(|| missing("log index"))?,
        tx_hash: log.transaction_hash.ok_or_else(|| missing("tx hash"))?,
    })
}

#[async_trait]
impl ChainReader for AlloyChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, Error> {
        self.policy
            .run("eth_call", || {
                let tx = TransactionRequest::default()
                    .with_to(to)
                    .with_input(data.clone());
                async move {
                    self.provider.call(tx).await.map_err(map_rpc_error)
                }
            })
            .await
    }

    async fn block_number(&self) -> Result<u64, Error> {
        self.policy
            .run("eth_blockNumber", || async move {
                self.provider.get_block_number().await.map_err(map_rpc_error)
            })
            .await
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, Error> {
        let request = Filter::new()
            .address(filter.addresses.clone())
            .event_signature(filter.topics.clone())
            .from_block(filter.from_block)
            .to_block(filter.to_block);
        let request = &request;

        let logs = self
            .policy
            .run("eth_getLogs", || async move {
                self.provider.get_logs(request).await.map_err(map_rpc_error)
            })
            .await?;

        logs.iter().map(convert_log).collect()
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<ChainReceipt>, Error> {
        let receipt = self
            .policy
            .run("eth_getTransactionReceipt", || async move {
                self.provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(map_rpc_error)
            })
            .await?;

        let receipt = match receipt {
            Some(receipt) => receipt,
            None => return Ok(None),
        };

        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(convert_log)
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Some(ChainReceipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            logs,
        }))
    }

    async fn transaction_pending(&self, hash: B256) -> Result<bool, Error> {
        let tx = self
            .policy
            .run("eth_getTransactionByHash", || async move {
                self.provider
                    .get_transaction_by_hash(hash)
                    .await
                    .map_err(map_rpc_error)
            })
            .await?;

        Ok(tx.is_some())
    }
}

/// Typed view call. A reply that does not decode as the declared return
/// type is a `DecodeError`.
pub async fn read<C>(
    chain: &dyn ChainReader,
    to: Address,
    call: C,
) -> Result<C::Return, Error>
where
    C: SolCall + Send,
{
    let output = chain.call(to, Bytes::from(call.abi_encode())).await?;

    C::abi_decode_returns(&output).map_err(|e| {
        Error::DecodeError(format!(
            "{} on {}: {}",
            C::SIGNATURE,
            address_key(&to),
            e
        ))
    })
}

pub fn decode_log<E: SolEvent>(log: &ChainLog) -> Result<E, Error> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data).map_err(|e| {
        Error::DecodeError(format!(
            "{} in tx {} log {}: {}",
            E::SIGNATURE,
            log.tx_hash,
            log.log_index,
            e
        ))
    })
}

/// Fetches `[from, to]` in chunks of at most `max_range` blocks. A chunk the
/// node rejects is halved until it is a single block; a single block that
/// is still rejected fails the whole range, as does an unreachable node.
/// Output is in (block, log index) order.
pub async fn logs_in_range(
    chain: &dyn ChainReader,
    filter: &LogFilter,
    max_range: u64,
) -> Result<Vec<ChainLog>, Error> {
    let (from, to) = (filter.from_block, filter.to_block);
    if from > to {
        return Ok(vec![]);
    }

    let max_range = max_range.max(1);
    let mut chunks = vec![];
    let mut start = from;
    loop {
        let end = start.saturating_add(max_range - 1).min(to);
        chunks.push((start, end));
        if end >= to {
            break;
        }
        start = end + 1;
    }
    chunks.reverse();

    let mut logs = vec![];
    while let Some((start, end)) = chunks.pop() {
        match chain.logs(&filter.range(start, end)).await {
            Ok(mut chunk) => {
                debug!(from = start, to = end, count = chunk.len(), "logs");
                logs.append(&mut chunk);
            },
            Err(e @ Error::DecodeError(_)) if end > start => {
                let mid = start + (end - start) / 2;
                warn!(
                    from = start,
                    to = end,
                    "log range rejected, splitting: {}",
                    e
                );
                chunks.push((mid + 1, end));
                chunks.push((start, mid));
            },
            Err(e) => return Err(e),
        }
    }

    logs.sort_by_key(|log| log.position());
    logs.dedup_by_key(|log| (log.tx_hash, log.log_index));

    Ok(logs)
}
