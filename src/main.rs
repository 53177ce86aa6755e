use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use stonk_tracker::cli::{Cli, Command};
use stonk_tracker::commands;
use stonk_tracker::config::Config;
use stonk_tracker::polygon::rest::PolygonClient;
use stonk_tracker::price_store::{PriceStore, SqlitePriceStore};
use stonk_tracker::quote_source::QuoteSource;
use stonk_tracker::sync::{SyncEngine, SyncSummary};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                level
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, dropping fetches not yet dispatched");
            token.cancel();
        }
    });
    cancel
}

fn log_summary(label: &str, summary: &SyncSummary) {
    tracing::info!(
        requested = summary.requested,
        fetched = summary.fetched,
        failed = summary.failed,
        cancelled = summary.cancelled,
        inserted = summary.inserted,
        "{} summary",
        label
    );
    for (symbol, watermark) in &summary.watermarks {
        tracing::info!(symbol = %symbol, watermark = %watermark, "Watermark");
    }
}

fn build_engine(config: &Config, store: &Arc<dyn PriceStore>) -> Result<SyncEngine> {
    let source: Arc<dyn QuoteSource> = Arc::new(
        PolygonClient::new(&config.polygon)
            .context("failed to build Polygon client (set POLYGON_IO_KEYS or POLYGON_IO_KEY_1)")?,
    );
    Ok(commands::sync_engine(
        Arc::clone(store),
        source,
        config.sync.max_concurrent_fetches,
        config.sync.historical_window,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.level);

    let store: Arc<dyn PriceStore> = Arc::new(
        SqlitePriceStore::open(&config.store.path)
            .with_context(|| format!("failed to open store {}", config.store.path.display()))?,
    );
    tracing::debug!(path = %config.store.path.display(), "Price store opened");

    let today = chrono::Local::now().date_naive();
    let stdout = std::io::stdout();

    match cli.command {
        Command::Refresh => {
            let engine = build_engine(&config, &store)?;
            let cancel = cancel_on_ctrl_c();
            let summary = commands::handle_refresh(&engine, today, &cancel).await?;
            log_summary("Refresh", &summary);
        }
        Command::Add { symbol } => {
            let engine = build_engine(&config, &store)?;
            let cancel = cancel_on_ctrl_c();
            let summary = commands::handle_add(&engine, &symbol, today, &cancel).await?;
            log_summary("Add", &summary);
        }
        Command::Info => {
            let stats = commands::handle_info(
                store.as_ref(),
                config.analysis.window,
                today,
                &mut stdout.lock(),
            )?;
            tracing::info!(
                reported = stats.reported,
                skipped = stats.skipped,
                "Info finished"
            );
        }
        Command::Symbols => {
            commands::handle_symbols(store.as_ref(), &mut stdout.lock())?;
        }
    }
    Ok(())
}
