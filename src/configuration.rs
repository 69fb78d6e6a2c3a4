use std::{
    env, fmt::Display, ops::Deref, str::FromStr, sync::Arc, time::Duration,
};

use alloy::primitives::Address;

use crate::{
    cache::{self, ReadCache},
    dao::Store,
    error::Error,
    helpers::parse_address,
    provider::{AlloyChain, ChainReader, DatabasePool, RetryPolicy},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

/// Everything a flow needs, constructed once per process.
pub struct State {
    pub config: Config,
    pub chain: Arc<dyn ChainReader>,
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn ReadCache>,
}

impl State {
    pub fn new(
        config: Config,
        chain: Arc<dyn ChainReader>,
        store: Arc<dyn Store>,
        cache: Arc<dyn ReadCache>,
    ) -> State {
        State {
            config,
            chain,
            store,
            cache,
        }
    }

    pub async fn connect(config: Config) -> Result<State, Error> {
        let database = DatabasePool::new(&config).await?;
        Self::with_store(config, Arc::new(database)).await
    }

    /// Live chain and cache, caller-chosen store (dry runs use memory).
    pub async fn with_store(
        config: Config,
        store: Arc<dyn Store>,
    ) -> Result<State, Error> {
        let chain = AlloyChain::new(&config)?;
        let cache = cache::connect(&config).await?;
        Ok(State::new(config, Arc::new(chain), store, cache))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_seconds)
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State").field("config", &self.config).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rpc_url: String,
    pub factory_address: Address,
    pub rpc_timeout_ms: u64,
    pub rpc_max_retries: u32,
    pub rpc_backoff_ms: u64,
    pub log_max_block_range: u64,
    pub start_block: u64,
    pub confirmations: u64,
    pub sync_concurrency: usize,
    pub cache_ttl_seconds: u64,
    pub redis_url: Option<String>,
    pub cache_prefix: String,
    pub server_host: String,
    pub port: u16,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_lookup<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, Error> {
            lookup(key).filter(|value| !value.is_empty()).ok_or_else(|| {
                Error::ConfigurationError(format!("{} is not set", key))
            })
        };

        let database_url = required("DATABASE_URL")?;
        let rpc_url = required("RPC_URL")?;
        let factory_address = parse_address(&required("FACTORY_ADDRESS")?)
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        let redis_url = lookup("REDIS_URL").filter(|value| !value.is_empty());

        let config = Config {
            database_url,
            rpc_url,
            factory_address,
            rpc_timeout_ms: parse_or(&lookup, "RPC_TIMEOUT_MS", 10_000)?,
            rpc_max_retries: parse_or(&lookup, "RPC_MAX_RETRIES", 3)?,
            rpc_backoff_ms: parse_or(&lookup, "RPC_BACKOFF_MS", 250)?,
            log_max_block_range: parse_or(
                &lookup,
                "LOG_MAX_BLOCK_RANGE",
                2_000,
            )?,
            start_block: parse_or(&lookup, "START_BLOCK", 0)?,
            confirmations: parse_or(&lookup, "CONFIRMATIONS", 1)?,
            sync_concurrency: parse_or(&lookup, "SYNC_CONCURRENCY", 8)?,
            cache_ttl_seconds: parse_or(&lookup, "CACHE_TTL_SECONDS", 30)?,
            redis_url,
            cache_prefix: lookup("CACHE_PREFIX")
                .unwrap_or_else(|| String::from("market-sync")),
            server_host: lookup("SERVER_HOST")
                .unwrap_or_else(|| String::from("127.0.0.1")),
            port: parse_or(&lookup, "PORT", 8080)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
        };

        if config.log_max_block_range == 0 {
            return Err(Error::ConfigurationError(String::from(
                "LOG_MAX_BLOCK_RANGE must be greater than zero",
            )));
        }

        if config.sync_concurrency == 0 {
            return Err(Error::ConfigurationError(String::from(
                "SYNC_CONCURRENCY must be greater than zero",
            )));
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.rpc_timeout_ms),
            max_retries: self.rpc_max_retries,
            backoff: Duration::from_millis(self.rpc_backoff_ms),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|value| !value.is_empty()) {
        Some(value) => value.trim().parse::<T>().map_err(|e| {
            Error::ConfigurationError(format!("{}: {}", key, e))
        }),
        None => Ok(default),
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    Config::from_lookup(|key| env::var(key).ok())
}

/// Loads `.env` into the process environment when one exists.
pub fn set_configuration() -> Result<(), Error> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::ConfigurationError(e.to_string())),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(String::from("postgres://localhost/test")),
        "RPC_URL" => Some(String::from("http://localhost:8545")),
        "FACTORY_ADDRESS" => {
            Some(String::from("0x00000000000000000000000000000000000000fa"))
        },
        "RPC_BACKOFF_MS" => Some(String::from("1")),
        "RPC_MAX_RETRIES" => Some(String::from("2")),
        "LOG_MAX_BLOCK_RANGE" => Some(String::from("100")),
        "SYNC_CONCURRENCY" => Some(String::from("4")),
        _ => None,
    })
    .expect("test config")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        values: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RPC_URL", "http://node"),
            ("FACTORY_ADDRESS", "0x00000000000000000000000000000000000000Fa"),
        ]))
        .unwrap();

        assert_eq!(config.rpc_max_retries, 3);
        assert_eq!(config.cache_ttl_seconds, 30);
        assert_eq!(config.log_max_block_range, 2_000);
        assert!(config.redis_url.is_none());
        assert_eq!(config.cache_prefix, "market-sync");
    }

    #[test]
    fn missing_and_malformed_values_are_rejected() {
        let missing =
            Config::from_lookup(lookup(&[("RPC_URL", "http://node")]));
        assert!(matches!(missing, Err(Error::ConfigurationError(_))));

        let malformed = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RPC_URL", "http://node"),
            ("FACTORY_ADDRESS", "0x00000000000000000000000000000000000000fa"),
            ("RPC_MAX_RETRIES", "many"),
        ]));
        assert!(matches!(malformed, Err(Error::ConfigurationError(_))));
    }
}
