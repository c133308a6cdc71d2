//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs logging,
//! builds the engine and prints every event. It handles all output,
//! including errors, and returns only the exit code.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, warn};

use super::args::{Cli, Commands};
use crate::exit_codes::{codes, for_stream_end};
use nlquery_config::{CliArgs, Config};
use nlquery_engine::{EngineSettings, LlmCompletionClient, StreamEvent, WorkflowEngine};
use nlquery_store::SqliteStore;
use nlquery_utils::error::{ConfigError, NlqueryError, UserFriendlyError};
use nlquery_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(code)` after printing the failure; `main` only exits.
pub fn run() -> Result<(), i32> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialise logging: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        database_path: cli.database.clone(),
        model: cli.model.clone(),
    };

    let config = load_config(&cli_args).map_err(|err| {
        eprintln!("Error: {}", config_error_message(&err));
        codes::CONFIG
    })?;

    match cli.command {
        Commands::Config => {
            print_config(&config);
            Ok(())
        }
        Commands::Ask { question } => {
            let runtime = tokio::runtime::Runtime::new().map_err(|e| {
                eprintln!("Error: failed to start async runtime: {e}");
                codes::FAILURE
            })?;
            runtime.block_on(ask(&config, &question))
        }
    }
}

/// Discover, merge and validate configuration for this invocation.
fn load_config(cli_args: &CliArgs) -> anyhow::Result<Config> {
    Config::discover(cli_args).context("Failed to load configuration")
}

/// Validation failures get their friendly wording; anything else prints the
/// whole context chain.
fn config_error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ConfigError>() {
        Some(config_err) => config_err.user_message(),
        None => format!("{err:#}"),
    }
}

/// Wire the configured backend, store and settings into an engine.
///
/// # Errors
///
/// Fails when the provider is unknown or incomplete, the database cannot be
/// opened, or a configured schema file cannot be read.
pub async fn build_engine(config: &Config) -> Result<WorkflowEngine, NlqueryError> {
    let backend = nlquery_llm::from_config(config)?;
    let client = LlmCompletionClient::new(backend, config.model(), config.llm_timeout());
    let store = SqliteStore::connect(config.database_path(), config.max_connections()).await?;
    let settings = EngineSettings::from_config(config)?;
    debug!(
        provider = config.provider(),
        model = config.model(),
        database = config.database_path(),
        "Engine ready"
    );
    Ok(WorkflowEngine::new(Arc::new(client), Arc::new(store), settings))
}

async fn ask(config: &Config, question: &str) -> Result<(), i32> {
    let engine = build_engine(config).await.map_err(|e| {
        eprintln!("{}", e.display_for_user());
        e.exit_code()
    })?;

    let mut stream = engine.run(question);
    let mut last: Option<StreamEvent> = None;
    while let Some(event) = stream.next().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(event = event.kind(), error = %e, "Failed to serialize event"),
        }
        last = Some(event);
    }

    match for_stream_end(last.as_ref()) {
        codes::SUCCESS => Ok(()),
        code => Err(code),
    }
}

fn print_config(config: &Config) {
    println!("Effective configuration:");
    for (key, value, source) in config.effective() {
        println!("  {key} = {value}  ({source})");
    }
}
