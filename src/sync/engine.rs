use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::config::normalize_ticker;
use crate::error::AppError;
use crate::model::bar::{sort_oldest_first, RawBar};
use crate::price_store::PriceStore;

use super::fetch_coordinator::{FetchCoordinator, FetchReport, FetchRequest};
use super::gap_planner::{bootstrap_window, missing_trading_days};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub requested: usize,
    pub fetched: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub lost: usize,
    pub inserted: usize,
    /// Watermark per symbol after the run.
    pub watermarks: BTreeMap<String, NaiveDate>,
    /// Symbols with planned days but no fetched bar.
    pub skipped: Vec<String>,
}

impl SyncSummary {
    fn from_report(report: &FetchReport) -> Self {
        Self {
            requested: report.requested,
            fetched: report.fetched(),
            failed: report.failures.len(),
            cancelled: report.cancelled,
            lost: report.lost,
            ..Self::default()
        }
    }
}

/// Plans gaps, fetches them and commits the results per symbol.
pub struct SyncEngine {
    store: Arc<dyn PriceStore>,
    coordinator: FetchCoordinator,
    historical_window: usize,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn PriceStore>,
        coordinator: FetchCoordinator,
        historical_window: usize,
    ) -> Self {
        Self {
            store,
            coordinator,
            historical_window,
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn PriceStore) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }

    /// Bring every tracked symbol from its watermark up to yesterday.
    ///
    /// A symbol whose fetches all failed is skipped; any other store error ends the run.
    pub async fn refresh(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        let symbols = self.with_store(|store| store.list_symbols()).await?;
        let mut planned = Vec::new();
        let mut requests = Vec::new();
        for symbol in &symbols {
            let gaps = missing_trading_days(symbol.last_fetched_date, today);
            tracing::info!(
                symbol = %symbol.ticker,
                watermark = %symbol.last_fetched_date,
                gaps = gaps.len(),
                "Planned missing trading days"
            );
            if gaps.is_empty() {
                continue;
            }
            planned.push(symbol.ticker.clone());
            requests.extend(gaps.into_iter().map(|date| FetchRequest {
                symbol: symbol.ticker.clone(),
                date,
            }));
        }

        let mut summary = if requests.is_empty() {
            tracing::info!(symbols = symbols.len(), "All symbols up to date");
            SyncSummary::default()
        } else {
            let report = self.coordinator.fetch_all(requests, cancel).await;
            let mut summary = SyncSummary::from_report(&report);
            let mut bars_by_symbol = report.bars_by_symbol;
            let batches: Vec<(String, Vec<RawBar>)> = planned
                .into_iter()
                .map(|ticker| {
                    let mut bars = bars_by_symbol.remove(&ticker).unwrap_or_default();
                    sort_oldest_first(&mut bars);
                    (ticker, bars)
                })
                .collect();
            let (inserted, skipped) = self
                .with_store(move |store| commit_batches(store, batches))
                .await?;
            summary.inserted = inserted;
            summary.skipped = skipped;
            summary
        };

        let tickers: Vec<String> = symbols.into_iter().map(|s| s.ticker).collect();
        summary.watermarks = self
            .with_store(move |store| read_watermarks(store, &tickers))
            .await?;
        tracing::info!(
            requested = summary.requested,
            inserted = summary.inserted,
            failed = summary.failed,
            skipped = summary.skipped.len(),
            "Refresh finished"
        );
        Ok(summary)
    }

    /// Start tracking a symbol by fetching its recent history.
    ///
    /// Already-tracked symbols only gain the days they were missing in the window.
    pub async fn add_symbol(
        &self,
        raw_ticker: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        let ticker = normalize_ticker(raw_ticker)?;
        let lookup = ticker.clone();
        if let Some(existing) = self
            .with_store(move |store| store.get_symbol(&lookup))
            .await?
        {
            tracing::info!(
                symbol = %ticker,
                watermark = %existing.last_fetched_date,
                "Symbol already tracked, filling bootstrap window"
            );
        }

        let requests: Vec<FetchRequest> = bootstrap_window(self.historical_window, today)
            .into_iter()
            .map(|date| FetchRequest {
                symbol: ticker.clone(),
                date,
            })
            .collect();

        let mut report = self.coordinator.fetch_all(requests, cancel).await;
        let mut summary = SyncSummary::from_report(&report);
        let mut bars = report.bars_by_symbol.remove(&ticker).unwrap_or_default();
        sort_oldest_first(&mut bars);

        let commit = ticker.clone();
        let (inserted, watermarks) = self
            .with_store(move |store| {
                let inserted = store.insert_bars(&commit, &bars)?;
                Ok((inserted, read_watermarks(store, &[commit])?))
            })
            .await?;
        summary.inserted = inserted;
        summary.watermarks = watermarks;
        tracing::info!(
            symbol = %ticker,
            inserted = summary.inserted,
            failed = summary.failed,
            "Symbol added"
        );
        Ok(summary)
    }
}

fn commit_batches(
    store: &dyn PriceStore,
    batches: Vec<(String, Vec<RawBar>)>,
) -> Result<(usize, Vec<String>), AppError> {
    let mut inserted = 0;
    let mut skipped = Vec::new();
    for (ticker, bars) in batches {
        match store.insert_bars(&ticker, &bars) {
            Ok(n) => inserted += n,
            Err(e) if e.is_no_data() => {
                tracing::warn!(symbol = %ticker, "No bars fetched, symbol skipped");
                skipped.push(ticker);
            }
            Err(e) => return Err(e),
        }
    }
    Ok((inserted, skipped))
}

fn read_watermarks(
    store: &dyn PriceStore,
    tickers: &[String],
) -> Result<BTreeMap<String, NaiveDate>, AppError> {
    let mut out = BTreeMap::new();
    for ticker in tickers {
        if let Some(record) = store.get_symbol(ticker)? {
            out.insert(record.ticker, record.last_fetched_date);
        }
    }
    Ok(out)
}
