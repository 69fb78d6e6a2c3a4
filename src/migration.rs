//! Database migrations using refinery
//!
//! Migrations are embedded at compile time and tracked in the
//! `refinery_schema_history` table.

use refinery::{embed_migrations, Report, Target};
use tokio_postgres::{Client, NoTls};

use crate::error::Error;

embed_migrations!("migrations");

async fn connect(database_url: &str) -> Result<Client, Error> {
    let config: tokio_postgres::Config = database_url.parse().map_err(|e| {
        Error::ConfigurationError(format!("Invalid database URL: {}", e))
    })?;

    let (client, connection) = config.connect(NoTls).await.map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to connect for migrations: {}",
            e
        ))
    })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Migration connection error: {}", e);
        }
    });

    Ok(client)
}

async fn run(database_url: &str, target: Target) -> Result<Report, Error> {
    let mut client = connect(database_url).await?;

    migrations::runner()
        .set_target(target)
        .run_async(&mut client)
        .await
        .map_err(|e| {
            Error::ConfigurationError(format!("Migration failed: {}", e))
        })
}

/// Runs every pending migration. A failing migration rolls back.
pub async fn run_migrations(database_url: &str) -> Result<(), Error> {
    tracing::info!("Running database migrations...");

    let report = run(database_url, Target::Latest).await?;
    let applied = report.applied_migrations();

    if applied.is_empty() {
        tracing::info!("No new migrations to apply");
        return Ok(());
    }

    for migration in applied {
        tracing::info!(
            "Applied migration: V{:03}__{} (checksum: {})",
            migration.version(),
            migration.name(),
            migration.checksum()
        );
    }
    tracing::info!("Successfully applied {} migration(s)", applied.len());

    Ok(())
}

/// Marks migrations as applied without executing them, for databases whose
/// schema was created by hand. `None` fakes all of them.
pub async fn run_migrations_fake(
    database_url: &str,
    up_to_version: Option<u32>,
) -> Result<(), Error> {
    let target = match up_to_version {
        None => Target::Fake,
        Some(v) => Target::FakeVersion(v),
    };

    let report = run(database_url, target).await?;
    let applied = report.applied_migrations();

    if applied.is_empty() {
        tracing::info!("No migrations to mark as applied");
        return Ok(());
    }

    for migration in applied {
        tracing::info!(
            "Marked as applied: V{:03}__{}",
            migration.version(),
            migration.name()
        );
    }
    tracing::info!("Marked {} migration(s) as applied", applied.len());

    Ok(())
}
