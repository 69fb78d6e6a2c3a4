use alloy::{
    primitives::{Address, B256},
    sol_types::SolEvent,
};
use tracing::debug;

use crate::{
    configuration::State,
    error::Error,
    helpers::{address_key, tx_hash_key},
    provider::{decode_log, ChainLog, ChainReceipt},
};

/// Receipt of a mined, successful transaction with at least the configured
/// number of confirmations.
pub async fn confirmed_receipt(
    state: &State,
    tx_hash: B256,
) -> Result<ChainReceipt, Error> {
    let chain = state.chain.as_ref();
    let key = tx_hash_key(&tx_hash);

    let receipt = match chain.transaction_receipt(tx_hash).await? {
        Some(receipt) => receipt,
        None => {
            if chain.transaction_pending(tx_hash).await? {
                return Err(Error::TxPending(key));
            }
            return Err(Error::TxNotFound(key));
        },
    };

    let block = match receipt.block_number {
        Some(block) => block,
        None => return Err(Error::TxPending(key)),
    };

    let required = state.config.confirmations;
    if required > 1 {
        let head = chain.block_number().await?;
        let depth = head.saturating_sub(block) + 1;
        if depth < required {
            debug!(tx = %key, depth, required, "not enough confirmations");
            return Err(Error::TxPending(format!(
                "{} has {} of {} confirmations",
                key, depth, required
            )));
        }
    }

    if !receipt.success {
        return Err(Error::EventNotFound(format!("{} reverted", key)));
    }

    Ok(receipt)
}

/// First `E` log emitted by `emitter`. Logs from other contracts or with
/// other signatures are ignored, so unrelated transactions are rejected.
pub fn find_event<E: SolEvent>(
    receipt: &ChainReceipt,
    emitter: Address,
) -> Result<(E, &ChainLog), Error> {
    let log = receipt
        .logs
        .iter()
        .find(|log| {
            log.address == emitter && log.topic0() == Some(E::SIGNATURE_HASH)
        })
        .ok_or_else(|| {
            Error::EventNotFound(format!(
                "no {} from {} in {}",
                E::SIGNATURE,
                address_key(&emitter),
                tx_hash_key(&receipt.tx_hash)
            ))
        })?;

    Ok((decode_log::<E>(log)?, log))
}
