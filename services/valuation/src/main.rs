//! Property valuation: HTTP prediction service and model tooling.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use modelops::ArtifactFormat;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use training::DataSourceKind;
use valuation::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "valuation")]
#[command(about = "Property price prediction service and model tooling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the latest model over HTTP
    Serve,

    /// Train a new model version and record its metrics
    Train {
        /// csv, db or db-with-preprocessing
        #[arg(long, default_value = "csv")]
        data_source: DataSourceKind,

        /// Training CSV (csv source)
        #[arg(long = "train")]
        train_path: Option<PathBuf>,

        /// Test CSV (csv source)
        #[arg(long = "test")]
        test_path: Option<PathBuf>,

        /// Postgres URL (db sources)
        #[arg(long, env = "DATABASE_URL")]
        db_url: Option<String>,

        /// Table to read, optionally schema-qualified (db sources)
        #[arg(long)]
        table_name: Option<String>,

        /// Artifact format: bincode or json
        #[arg(long, default_value = "bincode")]
        format: ArtifactFormat,
    },

    /// Generate an API key and store it in the secrets file
    Keygen {
        /// Secrets entry to write (defaults to API_CLIENT)
        #[arg(long)]
        client: Option<String>,
    },

    /// Print request statistics and model history
    Monitor {
        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    let _guard = init_tracing(&cfg.log_dir);

    match cli.command {
        Commands::Serve => commands::serve::run(cfg).await?,
        Commands::Train {
            data_source,
            train_path,
            test_path,
            db_url,
            table_name,
            format,
        } => {
            commands::train::run(
                &cfg,
                data_source,
                train_path,
                test_path,
                db_url,
                table_name,
                format,
            )
            .await?;
        }
        Commands::Keygen { client } => {
            let client = client.unwrap_or_else(|| cfg.api_client.clone());
            commands::keygen::run(&cfg.secrets_path, &client)?;
        }
        Commands::Monitor { json } => commands::monitor::run(&cfg, json)?,
    }

    Ok(())
}

/// Stdout plus a daily rolling `api.log` under `log_dir`. The returned guard
/// flushes the file writer on drop.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let file = tracing_appender::rolling::daily(log_dir, "api.log");
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    guard
}
