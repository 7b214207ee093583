use crate::{error::CliError, exit::ExitCode};
use clap::Parser;
use commands::Commands;
use engine_config::{
    catalog::load_catalog,
    env::EnvManager,
    settings::{Settings, database::destination_config},
};
use engine_core::{
    context::DatabaseContext,
    ledger::{SyncLedger, postgres::PgSyncLedger, stale_entries},
};
use engine_runtime::execution::executor;
use model::sync::ledger::LedgerEntry;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit;
mod output;

#[derive(Parser)]
#[command(
    name = "tablesync",
    version,
    about = "Incremental Postgres to Postgres table sync"
)]
struct Cli {
    #[arg(long, global = true, help = "Read settings from this file instead of ./.env")]
    env_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code.into(),
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            ExitCode::Failure.into()
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::new();
    match &cli.env_file {
        Some(path) => env.load_from_file(path)?,
        None => env.load_default_file()?,
    }
    init_logging(&env, cli.debug)?;

    match cli.command {
        Commands::Sync { json } => {
            let settings = Settings::from_env(&env)?;
            let catalog = load_catalog()?;
            let mut ctx = settings.database_context();

            info!("Starting sync of {} tables", catalog.tables().len());
            let result = executor::run(&ctx, &catalog, &settings.sync).await;
            ctx.close_all().await;
            let summary = result?;

            if json {
                output::print_json(&summary)?;
            } else {
                output::print_summary(&summary);
            }
            Ok(ExitCode::from_success(summary.is_success()))
        }
        Commands::TestConn => {
            let settings = Settings::from_env(&env)?;
            let mut ctx = settings.database_context();

            let source = ctx.source_pool().await.map(|_| ());
            let destination = ctx.destination_pool().await.map(|_| ());
            let mut healthy = true;
            for (role, result) in [("Source", source), ("Destination", destination)] {
                match result {
                    Ok(()) => println!("{role}: OK"),
                    Err(err) => {
                        healthy = false;
                        println!("{role}: FAILED - {err}");
                    }
                }
            }
            ctx.close_all().await;
            Ok(ExitCode::from_success(healthy))
        }
        Commands::InitLedger => {
            let mut ctx = DatabaseContext::destination_only(destination_config(&env)?);
            let result = init_ledger(&ctx).await;
            ctx.close_all().await;
            result?;
            println!("Ledger table is ready");
            Ok(ExitCode::Success)
        }
        Commands::Status { table, limit, json } => {
            let mut ctx = DatabaseContext::destination_only(destination_config(&env)?);
            let result = recent_entries(&ctx, table.as_deref(), limit).await;
            ctx.close_all().await;
            let entries = result?;

            let stale = stale_entries(&entries);
            if json {
                output::print_entries_json(&entries, &stale)?;
            } else {
                output::print_entries(&entries, &stale);
            }
            Ok(ExitCode::Success)
        }
        Commands::Tables { json } => {
            let catalog = load_catalog()?;
            if json {
                output::print_json(&catalog)?;
            } else {
                output::print_catalog(&catalog);
            }
            Ok(ExitCode::Success)
        }
    }
}

fn init_logging(env: &EnvManager, debug: bool) -> Result<(), CliError> {
    let debug = debug || env.get_flag("DEBUG");
    let directives = match env.get("RUST_LOG") {
        Some(filter) => filter.to_string(),
        None if debug => "debug,sqlx=warn".to_string(),
        None => "info,sqlx=warn".to_string(),
    };
    let filter =
        EnvFilter::try_new(&directives).map_err(|e| CliError::LogFilter(e.to_string()))?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn init_ledger(ctx: &DatabaseContext) -> Result<(), CliError> {
    let pool = ctx.destination_pool().await?;
    PgSyncLedger::new(pool.clone()).ensure_schema().await?;
    Ok(())
}

async fn recent_entries(
    ctx: &DatabaseContext,
    table: Option<&str>,
    limit: u64,
) -> Result<Vec<LedgerEntry>, CliError> {
    let pool = ctx.destination_pool().await?;
    let entries = PgSyncLedger::new(pool.clone())
        .recent_entries(table, limit)
        .await?;
    Ok(entries)
}
