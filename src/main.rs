use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clusters_identifier::config::Configuration;
use clusters_identifier::coordinator::CoordinatorBuilder;
use clusters_identifier::error::AppError;
use clusters_identifier::intake::{decode_batch, Server};
use clusters_identifier::pipeline::BatchProcessor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, Level};

#[derive(Parser)]
#[command(about = "Identifies segmented point clusters by position and color")]
struct Cli {
    /// Configuration file (TOML, JSON or YAML).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve segmentation clients over TCP (default).
    Serve,
    /// Process a file with one clusters message per line and print one
    /// identified batch per line.
    Replay { input: PathBuf },
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let configuration = Configuration::load(cli.config.as_deref())?;
    init_logging(configuration.max_log_level()?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(configuration).await,
        Command::Replay { input } => replay(configuration, input).await,
    }
}

async fn serve(configuration: Configuration) -> Result<(), AppError> {
    let listen_address = configuration.listen_address.clone();
    let coordinator = CoordinatorBuilder::new(configuration).build()?;
    let server = Server::bind(
        &listen_address,
        coordinator.batch_sender(),
        coordinator.publisher(),
    )
    .await?;

    let cancel_token = coordinator.cancel_token();
    let server_task = tokio::spawn(server.run(cancel_token.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel_token.cancel();

    server_task
        .await
        .map_err(|e| AppError::Pipeline(format!("Server task failed: {}", e)))??;
    coordinator.join().await
}

async fn replay(configuration: Configuration, input: PathBuf) -> Result<(), AppError> {
    let processor = BatchProcessor::new(configuration.identifier_config()?);
    let file = tokio::fs::File::open(&input).await?;
    let mut lines = BufReader::new(file).lines();
    let mut stdout = tokio::io::stdout();

    let mut batches = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let identified = processor.process(&decode_batch(line.as_bytes()));
        let mut encoded = serde_json::to_vec(&identified)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        batches += 1;
    }
    stdout.flush().await?;

    info!(batches, "Replay finished for {}", input.display());
    Ok(())
}
