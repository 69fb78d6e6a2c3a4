use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use market_sync::{
    cli::{self, Cli, Commands},
    configuration::AppState,
    error::Error,
    server,
    types::ProcessRequest,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Migrate { fake } => cli::run_migrate(fake).await,
        Commands::Resync { dry_run } => cli::run_resync(dry_run).await,
        Commands::ResyncPools => cli::run_resync_pools().await,
        Commands::Purge => cli::run_purge().await,
        Commands::Status => cli::run_status().await,
        Commands::VerifyClaim {
            tx_hash,
            market,
            user,
        } => cli::run_verify_claim(tx_hash, market, user).await,
        Commands::CanClaim { market, user } => {
            cli::run_can_claim(market, user).await
        },
        Commands::RecordBet { tx_hash, market } => {
            cli::run_record_bet(tx_hash, market).await
        },
        Commands::ProcessEvents {
            kind,
            market,
            from_block,
            to_block,
        } => {
            cli::run_process_events(ProcessRequest {
                kind,
                market,
                from_block,
                to_block,
            })
            .await
        },
    }
}

async fn serve() -> Result<(), Error> {
    let state = cli::init_state().await?;
    let app_state = AppState::new(state);

    server::server_task(&app_state).await
}
