use alloy::primitives::Address;
use tracing::info;

use crate::{
    configuration::State,
    error::Error,
    handler::receipt::{confirmed_receipt, find_event},
    helpers::{
        address_key, parse_address, parse_tx_hash, to_display_units,
        tx_hash_key, u256_to_i32,
    },
    model::Bet,
    provider::ChainLog,
    types::{abi::BetPlaced, BetRequest, RecordedBet},
};

/// Row for one decoded `BetPlaced` log.
pub fn bet_row(
    market: &Address,
    event: &BetPlaced,
    log: &ChainLog,
) -> Result<Bet, Error> {
    Ok(Bet {
        Tx_Hash: tx_hash_key(&log.tx_hash),
        BT_market_address: address_key(market),
        BT_wallet_address: address_key(&event.bettor),
        BT_outcome_index: u256_to_i32(event.outcomeIndex, "outcomeIndex")?,
        BT_amount: to_display_units(event.amount)?,
        BT_block_number: i64::try_from(log.block_number)?,
    })
}

/// Verifies a bet transaction and records it once per tx hash. Replaying
/// the same hash returns the bet with `inserted = false`.
pub async fn record_bet(
    state: &State,
    request: &BetRequest,
) -> Result<RecordedBet, Error> {
    let tx_hash = parse_tx_hash(&request.tx_hash)?;
    let market = parse_address(&request.market_address)?;

    let receipt = confirmed_receipt(state, tx_hash).await?;
    let (event, log) = find_event::<BetPlaced>(&receipt, market)?;
    let row = bet_row(&market, &event, log)?;

    let recorded = RecordedBet {
        tx_hash: row.Tx_Hash.clone(),
        market_address: row.BT_market_address.clone(),
        wallet_address: row.BT_wallet_address.clone(),
        outcome_index: row.BT_outcome_index,
        amount: row.BT_amount.clone(),
        block_number: log.block_number,
        inserted: false,
    };

    let inserted = state.store.insert_bet(row).await?;
    info!(
        tx = %recorded.tx_hash,
        market = %recorded.market_address,
        inserted,
        "bet verified"
    );

    Ok(RecordedBet {
        inserted,
        ..recorded
    })
}
