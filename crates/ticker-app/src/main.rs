//! Market-data ticker - Entry Point

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ticker_app::issuers::read_issuers;
use ticker_app::summary::write_json_file;
use ticker_app::{AppConfig, Application};
use ticker_telemetry::Metrics;
use tracing::{debug, info};

/// Ledger asset and market data ticker
#[derive(Parser, Debug)]
#[command(name = "ticker", version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TICKER_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Use the test network instead of the public network
    #[arg(long, global = true)]
    testnet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest new data into storage
    #[command(subcommand)]
    Ingest(IngestCommand),

    /// Generate reports about assets and markets
    #[command(subcommand)]
    Generate(GenerateCommand),
}

#[derive(Subcommand, Debug)]
enum IngestCommand {
    /// Refresh the asset table from the upstream listing
    Assets {
        /// Only refresh assets of the issuers listed in this file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Backfill trades, then optionally stream new ones
    Trades {
        /// Only backfill trades of the issuers listed in this file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Keep streaming new trades after the backfill
        #[arg(long)]
        stream: bool,

        /// Number of past hours to backfill
        #[arg(long)]
        num_hours: Option<i64>,

        /// Maximum trades to backfill per run (0 = unbounded)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    /// Aggregated 24h and 7d market data
    MarketData {
        #[arg(short, long, default_value = "markets.json")]
        out_file: PathBuf,
    },

    /// Last-24h market data for the issuers listed in a file
    PartialMarketData {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "partial-markets.json")]
        out_file: PathBuf,
    },

    /// Valid assets with issuer details
    AssetData {
        #[arg(short, long, default_value = "assets.json")]
        out_file: PathBuf,
    },
}

fn issuers_from(file: Option<&PathBuf>) -> Result<Vec<String>> {
    match file {
        Some(path) => {
            let issuers = read_issuers(path)?;
            info!(path = %path.display(), count = issuers.len(), "Loaded issuers");
            Ok(issuers)
        }
        None => Ok(Vec::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    ticker_telemetry::init_logging()?;

    info!("Starting ticker v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config.as_deref())?;
    let app = Application::new(config, args.testnet)?;

    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    match args.command {
        Command::Ingest(IngestCommand::Assets { file }) => {
            let issuers = issuers_from(file.as_ref())?;
            app.refresh_assets(&issuers).await?;
        }
        Command::Ingest(IngestCommand::Trades {
            file,
            stream,
            num_hours,
            limit,
        }) => {
            let issuers = issuers_from(file.as_ref())?;
            let hours = num_hours.unwrap_or(app.config().trades.backfill_hours);
            if hours < 0 {
                bail!("--num-hours must not be negative");
            }
            app.backfill_trades(&issuers, hours, limit).await?;
            if stream {
                app.stream_trades().await?;
            }
        }
        Command::Generate(GenerateCommand::MarketData { out_file }) => {
            let summary = app.market_summary(Utc::now()).await?;
            write_json_file(&out_file, &summary)?;
        }
        Command::Generate(GenerateCommand::PartialMarketData { file, out_file }) => {
            let issuers = read_issuers(&file)?;
            if issuers.is_empty() {
                bail!("issuer file {} lists no issuers", file.display());
            }
            let summary = app.partial_market_summary(&issuers, Utc::now()).await?;
            write_json_file(&out_file, &summary)?;
        }
        Command::Generate(GenerateCommand::AssetData { out_file }) => {
            let summary = app.asset_summary(Utc::now()).await?;
            write_json_file(&out_file, &summary)?;
        }
    }

    debug!(metrics = %Metrics::render()?, "Final metrics");
    info!("Done");
    Ok(())
}
