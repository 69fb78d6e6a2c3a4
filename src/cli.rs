//! Command-line triggers.
//!
//! Every flow the HTTP surface exposes can also be run once from the shell
//! (cron, operators). Results are printed to stdout as JSON.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    configuration::{get_configuration, set_configuration, Config, State},
    dao::MemoryStore,
    error::Error,
    handler::{bet, claim, event_processor, reconcile},
    migration,
    types::{BetRequest, ClaimRequest, EventKind, ProcessRequest},
};

/// Prediction market reconciliation service
#[derive(Parser)]
#[command(name = "market-sync")]
#[command(
    about = "On-chain/off-chain prediction market sync",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP trigger surface (default if no command specified)
    Serve,

    /// Run database migrations
    Migrate {
        /// Mark migrations as applied without running them. Alone it fakes
        /// all of them; with a version it fakes up to that version and runs
        /// the rest.
        #[arg(long)]
        fake: Option<Option<u32>>,
    },

    /// Enumerate the factory and mirror every market
    Resync {
        /// Write into an in-memory store and only print the report
        #[arg(long)]
        dry_run: bool,
    },

    /// Refresh pool totals of already mirrored markets
    ResyncPools,

    /// Delete mirrored markets recorded under another factory
    Purge,

    /// Show when each batch flow last completed
    Status,

    /// Verify a claim transaction and record the payout
    VerifyClaim {
        #[arg(long)]
        tx_hash: String,

        #[arg(long)]
        market: String,

        /// Wallet of the requesting user, compared against the claimant
        #[arg(long)]
        user: Option<String>,
    },

    /// Check whether a wallet may claim on a market
    CanClaim {
        /// Store id or market address
        #[arg(long)]
        market: String,

        #[arg(long)]
        user: String,
    },

    /// Verify a bet transaction and record the bet
    RecordBet {
        #[arg(long)]
        tx_hash: String,

        #[arg(long)]
        market: String,
    },

    /// Replay fee, pool or bet events into their aggregate rows
    ProcessEvents {
        /// fee-collected, pool-updated or bet-placed
        #[arg(long)]
        kind: EventKind,

        /// Limit to one market; every mirrored market otherwise
        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        from_block: Option<u64>,

        #[arg(long)]
        to_block: Option<u64>,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

/// Migrations first, then the live state every one-shot command shares.
pub async fn init_state() -> Result<State, Error> {
    let config = init_config()?;
    migration::run_migrations(&config.database_url).await?;
    State::connect(config).await
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run migrations
pub async fn run_migrate(fake: Option<Option<u32>>) -> Result<(), Error> {
    let config = init_config()?;

    match fake {
        // --fake (no version) - fake all migrations
        Some(None) => {
            tracing::info!("Marking all migrations as applied...");
            migration::run_migrations_fake(&config.database_url, None).await?;
            tracing::info!("All migrations marked as applied");
        },
        // --fake <version> - fake up to version, then run remaining
        Some(Some(version)) => {
            tracing::info!(
                "Marking migrations up to V{:03} as applied...",
                version
            );
            migration::run_migrations_fake(&config.database_url, Some(version))
                .await?;
            tracing::info!("Running remaining migrations...");
            migration::run_migrations(&config.database_url).await?;
            tracing::info!("Migrations complete");
        },
        None => {
            tracing::info!("Running database migrations...");
            migration::run_migrations(&config.database_url).await?;
            tracing::info!("Migrations complete");
        },
    }

    Ok(())
}

pub async fn run_resync(dry_run: bool) -> Result<(), Error> {
    let state = if dry_run {
        tracing::info!("DRY RUN MODE - nothing is written to the database");
        let config = init_config()?;
        State::with_store(config, Arc::new(MemoryStore::new())).await?
    } else {
        init_state().await?
    };

    let report = reconcile::resync_all(&state).await?;
    print_json(&report)
}

pub async fn run_resync_pools() -> Result<(), Error> {
    let state = init_state().await?;
    let report = reconcile::resync_pools(&state).await?;
    print_json(&report)
}

pub async fn run_purge() -> Result<(), Error> {
    let state = init_state().await?;
    let purged = reconcile::purge_foreign_markets(&state).await?;
    print_json(&serde_json::json!({ "purged": purged }))
}

pub async fn run_status() -> Result<(), Error> {
    let state = init_state().await?;
    let status = reconcile::sync_status(&state).await?;
    print_json(&status)
}

pub async fn run_verify_claim(
    tx_hash: String,
    market: String,
    user: Option<String>,
) -> Result<(), Error> {
    let state = init_state().await?;
    let request = ClaimRequest {
        tx_hash,
        market_address: market,
        user_id: user,
    };
    let claim = claim::verify_claim(&state, &request).await?;
    print_json(&claim)
}

pub async fn run_can_claim(market: String, user: String) -> Result<(), Error> {
    let state = init_state().await?;
    let eligibility = claim::can_claim(&state, &market, &user).await?;
    print_json(&eligibility)
}

pub async fn run_record_bet(
    tx_hash: String,
    market: String,
) -> Result<(), Error> {
    let state = init_state().await?;
    let request = BetRequest {
        tx_hash,
        market_address: market,
    };
    let recorded = bet::record_bet(&state, &request).await?;
    print_json(&recorded)
}

pub async fn run_process_events(request: ProcessRequest) -> Result<(), Error> {
    let state = init_state().await?;
    let report = event_processor::process_events(&state, &request).await?;
    print_json(&report)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn commands_parse() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from([
            "market-sync",
            "process-events",
            "--kind",
            "pool-updated",
            "--from-block",
            "12",
        ]);
        match cli.command {
            Some(Commands::ProcessEvents {
                kind, from_block, ..
            }) => {
                assert_eq!(kind, EventKind::PoolUpdated);
                assert_eq!(from_block, Some(12));
            },
            _ => panic!("unexpected command"),
        }

        let cli = Cli::parse_from(["market-sync", "migrate", "--fake", "2"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Migrate { fake: Some(Some(2)) })
        ));
    }
}
