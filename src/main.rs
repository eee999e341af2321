use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use propdb::migration::{migration_stats, EntityKind, Migrator};
use propdb::{DatabaseConfig, Gateway, PropDbError};

/// Property-management data tool.
///
/// The backend comes from the environment: `DB_TYPE` (`sqlite` or
/// `postgres`), `DB_PATH` for SQLite, `DB_HOST`/`DB_PORT`/`DB_NAME`/
/// `DB_USER`/`DB_PASSWORD` for PostgreSQL.
#[derive(Parser)]
#[command(name = "propdb", about = "Import and inspect property-management data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create any missing tables.
    InitSchema,
    /// Import a CSV file and print the migration report as JSON.
    Import {
        /// Kind of record the file holds.
        #[arg(value_enum)]
        kind: Entity,
        /// Path to the CSV file.
        file: PathBuf,
    },
    /// Print current row counts per table as JSON.
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum Entity {
    Property,
    Tenant,
    Lease,
    Invoice,
}

impl From<Entity> for EntityKind {
    fn from(entity: Entity) -> Self {
        match entity {
            Entity::Property => EntityKind::Property,
            Entity::Tenant => EntityKind::Tenant,
            Entity::Lease => EntityKind::Lease,
            Entity::Invoice => EntityKind::Invoice,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DatabaseConfig::from_env().context("reading database configuration")?;
    let gateway = Gateway::connect(&config)
        .await
        .context("opening database")?;

    let outcome = run(&gateway, cli.command).await;
    gateway.close().await;
    outcome
}

async fn run(gateway: &Gateway, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::InitSchema => {
            gateway.apply_schema().await?;
            tracing::info!(dialect = %gateway.dialect(), "Schema ready");
        }
        Commands::Import { kind, file } => {
            let kind = EntityKind::from(kind);
            match Migrator::new(gateway).migrate_file(kind, &file).await {
                Ok(result) => print_json(&result)?,
                Err(PropDbError::Stream { message, partial }) => {
                    print_json(&partial)?;
                    anyhow::bail!("import of {} aborted: {}", file.display(), message);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Stats => {
            let stats = migration_stats(gateway).await?;
            print_json(&stats)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
