//! Audit Investigator - document-grounded, hypothesis-driven audit investigations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use audit_investigator::ai::AiClient;
use audit_investigator::config::{ConfigLoader, InvestigatorConfig};
use audit_investigator::display;
use audit_investigator::evidence::{ingest_paths, DocumentRegistry, IngestionReport};
use audit_investigator::knowledge::load_sample_knowledge;
use audit_investigator::supervisor::{ModelDriver, Supervisor};

#[derive(Parser)]
#[command(
    name = "audit-investigator",
    about = "Document-grounded, hypothesis-driven audit investigations",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to the standard search paths).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and list their file ids.
    Index {
        /// Text files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show sample domain knowledge statistics.
    Knowledge,
    /// Run an investigation over the given documents.
    Run {
        /// The audit task to investigate.
        #[arg(short, long)]
        task: String,
        /// Transaction id recorded in the report.
        #[arg(long, default_value = "")]
        transaction_id: String,
        /// Text files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<InvestigatorConfig, String> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load().map_err(|e| e.to_string())
}

async fn ingest(
    files: &[PathBuf],
    config: &InvestigatorConfig,
) -> Result<(DocumentRegistry, IngestionReport), String> {
    let mut registry = DocumentRegistry::new();
    let report = ingest_paths(&mut registry, files, &config.chunking)
        .await
        .map_err(|e| e.to_string())?;
    for (path, reason) in &report.skipped {
        display::print_error(&format!("Skipped {}: {reason}", path.display()));
    }
    Ok((registry, report))
}

async fn run_command(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Index { files } => {
            let (_, report) = ingest(&files, &config).await?;
            for (file_id, chunks) in &report.registered {
                println!("{file_id}\t{chunks} chunks");
            }
        }
        Commands::Knowledge => {
            let store = load_sample_knowledge().map_err(|e| e.to_string())?;
            for (category, count) in store.category_stats() {
                println!("{category}\t{count} entries");
            }
        }
        Commands::Run {
            task,
            transaction_id,
            files,
        } => {
            let (registry, report) = ingest(&files, &config).await?;
            if report.is_empty() {
                return Err("No documents could be ingested".to_string());
            }

            let client = Arc::new(AiClient::from_config(config.ai.clone()).map_err(|e| e.to_string())?);
            let knowledge = Arc::new(load_sample_knowledge().map_err(|e| e.to_string())?);
            let max_tool_chars = config.retrieval.max_tool_chars;

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, finishing with current evidence");
                    ctrl_c.cancel();
                }
            });

            let mut supervisor = Supervisor::new(Arc::new(registry), knowledge, client.clone(), config)
                .with_cancellation(cancel);
            let mut driver = ModelDriver::new(client);

            let (tx, mut rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    display::print_event(&event, max_tool_chars);
                }
            });

            let result = supervisor
                .run_with_events(&task, &transaction_id, &mut driver, &tx)
                .await;
            drop(tx);
            let _ = printer.await;

            let audit = result.map_err(|e| e.to_string())?;
            println!("{}", audit.to_json_string());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_command(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            display::print_error(&message);
            ExitCode::FAILURE
        }
    }
}
