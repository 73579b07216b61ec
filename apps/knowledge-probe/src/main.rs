//! Knowledge Probe
//!
//! Checks that the vector database is reachable with the configured key and
//! previews how a statute text file is split into sections.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_knowledge::{
    chunk_by_section, ConnectionManager, QdrantClientFactory, TextChunk, VectorStoreClient,
};
use eyre::{Result, WrapErr};
use tracing::{info, warn};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "knowledge-probe")]
#[command(about = "Check vector database connectivity and preview chunking")]
struct Cli {
    /// Vector database host (overrides VECTOR_DB_URL)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Path to the JSON secret file (overrides VECTOR_DB_SECRETS_PATH)
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the client and issue one cheap call
    Check,

    /// List the indexes visible with the configured key
    Indexes,

    /// Split a text file at its section headings and print the records
    Chunk {
        /// Text file to split
        file: PathBuf,

        /// Category stored with every chunk
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(cli.host, cli.secrets);
    init_tracing(&config.environment);

    match cli.command {
        Commands::Check => {
            let manager = ConnectionManager::from_config(&config.vector_db, QdrantClientFactory);
            let reachable = manager.test_connection().await;
            manager.shutdown().await;

            if !reachable {
                eyre::bail!("vector database is not reachable");
            }
            info!("Vector database is reachable");
        }

        Commands::Indexes => {
            let manager = ConnectionManager::from_config(&config.vector_db, QdrantClientFactory);
            let result = async {
                let client = manager.get_client()?;
                Ok::<_, eyre::Report>(client.list_indexes().await?)
            }
            .await;
            manager.shutdown().await;

            for name in result? {
                println!("{}", name);
            }
        }

        Commands::Chunk { file, category } => {
            let text = std::fs::read_to_string(&file)
                .wrap_err_with(|| format!("Failed to read {}", file.display()))?;

            let records = TextChunk::records(chunk_by_section(&text), category.as_deref());
            if records.is_empty() {
                warn!(file = %file.display(), "No section headings found");
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
