use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::error::Error;

/// Decimals of the chain's base unit (18-decimal fixed point).
pub const BASE_UNIT_DECIMALS: u32 = 18;

pub fn parse_address(value: &str) -> Result<Address, Error> {
    Address::from_str(value.trim()).map_err(|e| {
        Error::InvalidInput(format!("invalid address {}: {}", value, e))
    })
}

pub fn parse_tx_hash(value: &str) -> Result<B256, Error> {
    B256::from_str(value.trim()).map_err(|e| {
        Error::InvalidInput(format!(
            "invalid transaction hash {}: {}",
            value, e
        ))
    })
}

/// Lowercase `0x`-prefixed hex, the only form addresses take in the store.
pub fn address_key(address: &Address) -> String {
    address.to_string().to_lowercase()
}

pub fn normalize_address(value: &str) -> Result<String, Error> {
    parse_address(value).map(|address| address_key(&address))
}

/// Wallet identifiers as stored. Hex addresses are canonicalized; any other
/// identifier is only trimmed and lowercased.
pub fn normalize_wallet(value: &str) -> String {
    match parse_address(value) {
        Ok(address) => address_key(&address),
        Err(_) => value.trim().to_lowercase(),
    }
}

pub fn tx_hash_key(hash: &B256) -> String {
    hash.to_string().to_lowercase()
}

/// Exact base-unit integer as a decimal, no scaling.
pub fn to_base_decimal(value: U256) -> Result<BigDecimal, Error> {
    Ok(BigDecimal::from_str(&value.to_string())?)
}

/// Base units to display units. Integer string plus exponent, so no
/// floating point is involved at any step.
pub fn to_display_units(value: U256) -> Result<BigDecimal, Error> {
    let scaled = format!("{}e-{}", value, BASE_UNIT_DECIMALS);
    Ok(BigDecimal::from_str(&scaled)?)
}

pub fn base_decimal_to_display(
    value: &BigDecimal,
) -> Result<BigDecimal, Error> {
    let unit = BigDecimal::from_str(&format!("1e-{}", BASE_UNIT_DECIMALS))?;
    Ok(value * unit)
}

/// Sum of stored base-unit pools, expressed in display units.
pub fn display_pool_sum(pools: &[BigDecimal]) -> Result<BigDecimal, Error> {
    let total = pools
        .iter()
        .fold(BigDecimal::zero(), |acc, value| acc + value);
    base_decimal_to_display(&total)
}

pub fn u256_to_u64(value: U256, field: &str) -> Result<u64, Error> {
    u64::try_from(value).map_err(|_| {
        Error::DecodeError(format!("{} out of range: {}", field, value))
    })
}

pub fn u256_to_i32(value: U256, field: &str) -> Result<i32, Error> {
    let value = u256_to_u64(value, field)?;
    i32::try_from(value).map_err(|_| {
        Error::DecodeError(format!("{} out of range: {}", field, value))
    })
}

pub fn timestamp_to_datetime(seconds: u64) -> Result<DateTime<Utc>, Error> {
    let seconds = i64::try_from(seconds)?;
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        Error::DecodeError(format!("timestamp out of range: {}", seconds))
    })
}
