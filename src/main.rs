//! Flurry CLI: provision the analyzer or run an analysis pass.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use tracing::info;

use flurry::analyze::{resolve_source, run_analysis};
use flurry::client::AnalysisClient;
use flurry::config::Config;
use flurry::error::{AppError, MissingSchemaPathSnafu};
use flurry::provision::{load_schema, provision_analyzer};
use flurry::storage::BlobStore;
use flurry::init_tracing;

#[derive(Parser, Debug)]
#[command(version, about = "Content-understanding analysis runner")]
struct CliArgs {
    /// Path to the configuration file
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete and recreate the configured analyzer from its schema
    Provision,
    /// Submit an input for analysis and append the extracted fields to the ledger
    Analyze {
        /// File path or URL to analyze (defaults to the configured input)
        input: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, command: Command) -> Result<(), AppError> {
    let service = &config.service;
    let client = AnalysisClient::new(
        &service.endpoint,
        &service.api_version,
        service.credentials()?,
    )?;

    match command {
        Command::Provision => {
            let schema_path = service
                .schema_path
                .as_deref()
                .context(MissingSchemaPathSnafu)?;
            let schema = load_schema(schema_path)?;
            provision_analyzer(
                &client,
                &service.analyzer_id,
                &schema,
                Duration::from_secs(service.poll_interval_secs),
            )
            .await
        }
        Command::Analyze { input } => {
            let store = BlobStore::from_connection_string(
                &config.storage.connection_string,
                &config.storage.container,
            )?;
            let source = resolve_source(service.input.as_deref(), input.as_deref()).await?;
            info!("Analyzing with analyzer {}", service.analyzer_id);
            run_analysis(config, &client, &store, source).await
        }
    }
}
