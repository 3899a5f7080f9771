//! Importer CLI for the ANVISA medicines registry
//!
//! The invocation boundary of the pipeline. Authentication of who may
//! trigger an import belongs to the API layer in front of this binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use anvisa_common::logging::{init_logging, LogConfig, LogLevel};
use anvisa_ingest::analyze::{analyze_source, verify_store};
use anvisa_ingest::config::ImportConfig;
use anvisa_ingest::pipeline::ImportPipeline;
use anvisa_ingest::store::{PgRecordStore, RecordStore};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "anvisa-ingest")]
#[command(author, version, about = "ANVISA medicines registry importer")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run a full-replace import into the record store
    Import {
        /// Source file path or URL (default: the published ANVISA export)
        #[arg(short, long)]
        source: Option<String>,

        /// Records per committed batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Wall-clock budget for the run, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Probe a source's encoding and delimiter without importing
    Analyze {
        /// Source file path or URL (default: the published ANVISA export)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Scan stored rows for encoding damage
    Verify {
        /// Rows to sample
        #[arg(short, long, default_value_t = 100)]
        limit: i64,
    },

    /// Print the stored row count
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    log_config.log_file_prefix = "anvisa-ingest".to_string();
    init_logging(&log_config)?;

    let mut config = ImportConfig::from_env()?;

    match cli.command {
        Command::Import {
            source,
            batch_size,
            timeout_secs,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(timeout_secs) = timeout_secs {
                config.run_timeout_secs = timeout_secs;
            }
            config.validate()?;

            let store = connect_store().await?;
            let pipeline = ImportPipeline::new(config, Arc::new(store));
            let run = pipeline.run(source.as_deref()).await;

            println!("{}", serde_json::to_string_pretty(&run)?);
            if !run.is_completed() {
                std::process::exit(1);
            }
        },

        Command::Analyze { source } => {
            let locator = source.unwrap_or_else(|| config.source_url.clone());
            let analysis = analyze_source(&config, &locator).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        },

        Command::Verify { limit } => {
            let store = connect_store().await?;
            let report = verify_store(&store, limit).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                std::process::exit(1);
            }
        },

        Command::Count => {
            let store = connect_store().await?;
            let count = store.count().await?;
            println!("{count}");
        },
    }

    Ok(())
}

async fn connect_store() -> Result<PgRecordStore> {
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PgRecordStore::connect(&database_url).await?;
    store.ensure_schema().await?;
    info!("database ready");
    Ok(store)
}
