use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use anyhow::Error as ANYHOW_ERROR;
use bigdecimal::ParseBigDecimalError as BIG_DECIMAL_ERROR;
use redis::RedisError as REDIS_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{
    env::VarError, io::Error as IO_ERROR, num::ParseIntError,
    num::TryFromIntError as TRY_FROM_INT_ERROR,
};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    TokioElapsedError(#[from] Elapsed),

    #[error("{0}")]
    BigDecimalError(#[from] BIG_DECIMAL_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    RedisError(#[from] REDIS_ERROR),

    #[error("Server end with error: {0}")]
    ServerError(String),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    TryFromIntError(#[from] TRY_FROM_INT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Transaction pending: {0}")]
    TxPending(String),

    #[error("Claim event not found: {0}")]
    EventNotFound(String),

    #[error("Already claimed: market {market}, wallet {wallet}")]
    AlreadyClaimed { market: String, wallet: String },

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Store conflict: {0}")]
    StoreConflict(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),
}

impl Error {
    /// Only transport-level chain failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ChainUnavailable(_))
    }

    /// Short machine-readable code used in batch reports and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ChainUnavailable(_) | Error::TokioElapsedError(_) => {
                "chain_unavailable"
            },
            Error::DecodeError(_) => "decode_error",
            Error::TxNotFound(_) => "tx_not_found",
            Error::TxPending(_) => "tx_pending",
            Error::EventNotFound(_) => "event_not_found",
            Error::AlreadyClaimed { .. } => "already_claimed",
            Error::NotEligible(_) => "not_eligible",
            Error::StoreConflict(_) => "store_conflict",
            Error::MarketNotFound(_) => "market_not_found",
            Error::InvalidInput(_)
            | Error::INT(_)
            | Error::BigDecimalError(_) => "invalid_input",
            _ => "internal",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_)
            | Error::INT(_)
            | Error::BigDecimalError(_) => StatusCode::BAD_REQUEST,

            Error::TxNotFound(_) | Error::MarketNotFound(_) => {
                StatusCode::NOT_FOUND
            },

            Error::AlreadyClaimed { .. } | Error::StoreConflict(_) => {
                StatusCode::CONFLICT
            },

            Error::EventNotFound(_) | Error::NotEligible(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            },

            Error::TxPending(_) => StatusCode::ACCEPTED,

            Error::ChainUnavailable(_) | Error::DecodeError(_) => {
                StatusCode::BAD_GATEWAY
            },

            Error::TokioElapsedError(_) => StatusCode::GATEWAY_TIMEOUT,

            Error::Io(_)
            | Error::URL(_)
            | Error::SQL(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::ConfigurationError(_)
            | Error::JsonError(_)
            | Error::RedisError(_)
            | Error::ServerError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::TryFromIntError(_)
            | Error::AnyHowError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
