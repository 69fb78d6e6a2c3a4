use alloy::{
    primitives::{Address, B256},
    sol_types::SolEvent,
};
use chrono::Utc;
use futures::{pin_mut, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    configuration::State,
    error::Error,
    handler::{bet::bet_row, reconcile::record_action, registry::market_at},
    helpers::{
        address_key, parse_address, to_base_decimal, to_display_units,
        tx_hash_key, u256_to_i32, u256_to_u64,
    },
    model::{Actions, Fee_Record, Pool_Total, UpsertOutcome, PROTOCOL_FEE},
    provider::{decode_log, ChainLog, EventFeed, LogFilter},
    types::{
        abi::{BetPlaced, PoolUpdated, ProtocolFeeCollected},
        EventFailure, EventKind, ProcessReport, ProcessRequest,
    },
};

fn topic(kind: EventKind) -> B256 {
    match kind {
        EventKind::FeeCollected => ProtocolFeeCollected::SIGNATURE_HASH,
        EventKind::PoolUpdated => PoolUpdated::SIGNATURE_HASH,
        EventKind::BetPlaced => BetPlaced::SIGNATURE_HASH,
    }
}

pub fn cursor_name(kind: EventKind, market: Option<&Address>) -> String {
    match market {
        Some(market) => format!("{}:{}", kind, address_key(market)),
        None => format!("{}:all", kind),
    }
}

/// Contracts whose logs feed `kind`. Fees are also emitted by the factory.
async fn emitters(
    state: &State,
    kind: EventKind,
    market: Option<Address>,
) -> Result<Vec<Address>, Error> {
    let mut addresses = match market {
        Some(market) => vec![market],
        None => state
            .store
            .list_markets()
            .await?
            .iter()
            .map(|market| parse_address(&market.MS_address))
            .collect::<Result<Vec<_>, Error>>()?,
    };

    if kind == EventKind::FeeCollected {
        addresses.push(state.config.factory_address);
    }
    addresses.sort();
    addresses.dedup();

    Ok(addresses)
}

enum Applied {
    Row(UpsertOutcome),
    Skipped(Error),
}

async fn apply_fee(state: &State, log: &ChainLog) -> Result<Applied, Error> {
    let event = match decode_log::<ProtocolFeeCollected>(log) {
        Ok(event) => event,
        Err(e) => return Ok(Applied::Skipped(e)),
    };

    let factory = state.config.factory_address;
    let market = if log.address == factory {
        let id = match u256_to_u64(event.marketId, "marketId") {
            Ok(id) => id,
            Err(e) => return Ok(Applied::Skipped(e)),
        };
        match market_at(state, factory, id).await {
            Ok(market) => market,
            Err(e) if e.is_retryable() => return Err(e),
            Err(e) => return Ok(Applied::Skipped(e)),
        }
    } else {
        log.address
    };

    let row = Fee_Record {
        FR_market_address: address_key(&market),
        FR_fee_type: PROTOCOL_FEE.to_string(),
        FR_amount: to_display_units(event.amount)?,
        FR_collector: address_key(&event.collector),
        Tx_Hash: tx_hash_key(&log.tx_hash),
        FR_block_number: i64::try_from(log.block_number)?,
        FR_log_index: i64::try_from(log.log_index)?,
        FR_updated_at: Utc::now(),
    };

    Ok(Applied::Row(state.store.upsert_fee_record(row).await?))
}

async fn apply_pool(state: &State, log: &ChainLog) -> Result<Applied, Error> {
    let event = match decode_log::<PoolUpdated>(log) {
        Ok(event) => event,
        Err(e) => return Ok(Applied::Skipped(e)),
    };
    let outcome = match u256_to_i32(event.outcomeIndex, "outcomeIndex") {
        Ok(outcome) => outcome,
        Err(e) => return Ok(Applied::Skipped(e)),
    };

    let row = Pool_Total {
        PT_market_address: address_key(&log.address),
        PT_outcome_index: outcome,
        PT_total: to_base_decimal(event.totalPool)?,
        Tx_Hash: tx_hash_key(&log.tx_hash),
        PT_block_number: i64::try_from(log.block_number)?,
        PT_log_index: i64::try_from(log.log_index)?,
        PT_updated_at: Utc::now(),
    };

    Ok(Applied::Row(state.store.upsert_pool_total(row).await?))
}

async fn apply_bet(state: &State, log: &ChainLog) -> Result<Applied, Error> {
    let row = match decode_log::<BetPlaced>(log)
        .and_then(|event| bet_row(&log.address, &event, log))
    {
        Ok(row) => row,
        Err(e) => return Ok(Applied::Skipped(e)),
    };

    match state.store.insert_bet(row).await {
        Ok(true) => Ok(Applied::Row(UpsertOutcome::Applied)),
        Ok(false) => Ok(Applied::Row(UpsertOutcome::Stale)),
        Err(e @ Error::MarketNotFound(_)) => Ok(Applied::Skipped(e)),
        Err(e) => Err(e),
    }
}

/// Replays `kind` logs into their aggregate rows. Rows are replaced, never
/// incremented, so overlapping or repeated ranges converge. The cursor is
/// advanced after each fully applied page; undecodable logs are reported
/// and skipped, store failures stop the run where it is.
pub async fn process_events(
    state: &State,
    request: &ProcessRequest,
) -> Result<ProcessReport, Error> {
    let market = match &request.market {
        Some(market) => Some(parse_address(market)?),
        None => None,
    };
    let kind = request.kind;
    let name = cursor_name(kind, market.as_ref());

    let from_block = match request.from_block {
        Some(block) => block,
        None => match state.store.get_cursor(&name).await? {
            Some(cursor) => {
                cursor.saturating_add(1).max(state.config.start_block)
            },
            None => state.config.start_block,
        },
    };

    let head = state.chain.block_number().await?;
    let safe_head =
        head.saturating_sub(state.config.confirmations.saturating_sub(1));
    let to_block = match request.to_block {
        Some(block) => block.min(safe_head),
        None => safe_head,
    };

    let mut report = ProcessReport {
        kind,
        cursor_name: name.clone(),
        from_block,
        to_block,
        events_seen: 0,
        rows_applied: 0,
        stale_skipped: 0,
        failed: vec![],
    };

    let addresses = emitters(state, kind, market).await?;
    if addresses.is_empty() || from_block > to_block {
        debug!(cursor = %name, from_block, to_block, "nothing to process");
        return Ok(report);
    }

    let filter = LogFilter::new(addresses, vec![topic(kind)]);
    let max_range = state.config.log_max_block_range;
    let feed =
        EventFeed::new(state.chain.as_ref(), filter, max_range, max_range);
    let pages = feed.pages(from_block, to_block);
    pin_mut!(pages);

    while let Some(page) = pages.try_next().await? {
        for log in &page.logs {
            report.events_seen += 1;

            let applied = match kind {
                EventKind::FeeCollected => apply_fee(state, log).await?,
                EventKind::PoolUpdated => apply_pool(state, log).await?,
                EventKind::BetPlaced => apply_bet(state, log).await?,
            };

            match applied {
                Applied::Row(UpsertOutcome::Applied) => {
                    report.rows_applied += 1
                },
                Applied::Row(UpsertOutcome::Stale) => {
                    report.stale_skipped += 1
                },
                Applied::Skipped(e) => {
                    warn!(
                        tx = %tx_hash_key(&log.tx_hash),
                        block = log.block_number,
                        log_index = log.log_index,
                        "event skipped: {}",
                        e
                    );
                    report.failed.push(EventFailure {
                        tx_hash: tx_hash_key(&log.tx_hash),
                        block_number: log.block_number,
                        log_index: log.log_index,
                        reason: e.to_string(),
                    });
                },
            }
        }

        state.store.set_cursor(&name, page.to_block).await?;
    }

    record_action(state, Actions::EventAction).await?;

    info!(
        cursor = %name,
        from_block,
        to_block,
        events = report.events_seen,
        applied = report.rows_applied,
        stale = report.stale_skipped,
        failed = report.failed.len(),
        "event replay finished"
    );

    Ok(report)
}
