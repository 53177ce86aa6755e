use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::price_store::PriceStore;
use crate::quote_source::QuoteSource;
use crate::report::analyze_symbol;
use crate::sync::{FetchCoordinator, SyncEngine, SyncSummary};

/// Counts from one `info` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoStats {
    pub reported: usize,
    pub skipped: usize,
}

pub fn sync_engine(
    store: Arc<dyn PriceStore>,
    source: Arc<dyn QuoteSource>,
    max_concurrent_fetches: usize,
    historical_window: usize,
) -> SyncEngine {
    SyncEngine::new(
        store,
        FetchCoordinator::new(source, max_concurrent_fetches),
        historical_window,
    )
}

pub async fn handle_refresh(
    engine: &SyncEngine,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Result<SyncSummary> {
    engine
        .refresh(today, cancel)
        .await
        .context("refresh failed")
}

pub async fn handle_add(
    engine: &SyncEngine,
    symbol: &str,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Result<SyncSummary> {
    engine
        .add_symbol(symbol, today, cancel)
        .await
        .with_context(|| format!("failed to add symbol {}", symbol.trim()))
}

/// Write one report block per symbol with a full analysis window.
pub fn handle_info(
    store: &dyn PriceStore,
    window: usize,
    today: NaiveDate,
    out: &mut impl Write,
) -> Result<InfoStats> {
    let symbols = store.list_symbols().context("failed to list symbols")?;
    let mut stats = InfoStats::default();
    for symbol in symbols {
        let bars = store
            .query_bars(&symbol.ticker, window, today)
            .with_context(|| format!("failed to load prices for {}", symbol.ticker))?;
        match analyze_symbol(&symbol.ticker, &bars, window) {
            Ok(insight) => {
                writeln!(out, "{}", insight)?;
                stats.reported += 1;
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol.ticker,
                    have = e.have,
                    need = e.need,
                    "Insufficient data points, skipping analysis"
                );
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

pub fn handle_symbols(store: &dyn PriceStore, out: &mut impl Write) -> Result<usize> {
    let symbols = store.list_symbols().context("failed to list symbols")?;
    for symbol in &symbols {
        writeln!(out, "{}\t{}", symbol.ticker, symbol.last_fetched_date)?;
    }
    Ok(symbols.len())
}
