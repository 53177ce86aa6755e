use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::model::bar::RawBar;
use crate::quote_source::QuoteSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub date: NaiveDate,
}

#[derive(Debug)]
pub struct FetchFailure {
    pub symbol: String,
    pub date: NaiveDate,
    pub error: AppError,
}

/// Outcome of one batch. `fetched + failures + cancelled + lost == requested`.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub requested: usize,
    /// Successful bars grouped by symbol, in arrival order.
    pub bars_by_symbol: HashMap<String, Vec<RawBar>>,
    pub failures: Vec<FetchFailure>,
    /// Requests dropped by cancellation before they were dispatched.
    pub cancelled: usize,
    /// Tasks that ended without reporting (panicked).
    pub lost: usize,
}

impl FetchReport {
    pub fn fetched(&self) -> usize {
        self.bars_by_symbol.values().map(Vec::len).sum()
    }
}

enum Outcome {
    Fetched(RawBar),
    Failed(FetchFailure),
    Cancelled,
}

/// Fans one task out per (symbol, date) and collects every outcome before returning.
pub struct FetchCoordinator {
    source: Arc<dyn QuoteSource>,
    max_in_flight: usize,
}

impl FetchCoordinator {
    /// `max_in_flight == 0` leaves concurrency unbounded.
    pub fn new(source: Arc<dyn QuoteSource>, max_in_flight: usize) -> Self {
        Self {
            source,
            max_in_flight,
        }
    }

    pub async fn fetch_all(
        &self,
        requests: Vec<FetchRequest>,
        cancel: &CancellationToken,
    ) -> FetchReport {
        let total = requests.len();
        let mut report = FetchReport {
            requested: total,
            ..FetchReport::default()
        };
        if total == 0 {
            return report;
        }

        let permits = match self.max_in_flight {
            0 => Semaphore::MAX_PERMITS,
            n => n,
        };
        let semaphore = Arc::new(Semaphore::new(permits));
        let (tx, mut rx) = mpsc::channel::<Outcome>(total);

        tracing::info!(total, max_in_flight = self.max_in_flight, "Dispatching price fetches");

        for request in requests {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Outcome::Cancelled,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(_permit) => {
                            match source.fetch_daily_bar(&request.symbol, request.date).await {
                                Ok(bar) => Outcome::Fetched(bar),
                                Err(error) => Outcome::Failed(FetchFailure {
                                    symbol: request.symbol,
                                    date: request.date,
                                    error,
                                }),
                            }
                        }
                        Err(_) => Outcome::Cancelled,
                    },
                };
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut seen = 0usize;
        while seen < total {
            let Some(outcome) = rx.recv().await else {
                report.lost = total - seen;
                tracing::error!(lost = report.lost, "Fetch tasks ended without reporting");
                break;
            };
            seen += 1;
            match outcome {
                Outcome::Fetched(bar) => {
                    report
                        .bars_by_symbol
                        .entry(bar.symbol.clone())
                        .or_default()
                        .push(bar);
                }
                Outcome::Failed(failure) => {
                    // Holidays land here too; the batch carries on without the date.
                    tracing::warn!(
                        symbol = %failure.symbol,
                        date = %failure.date,
                        error = %failure.error,
                        "Price fetch failed, skipping date"
                    );
                    report.failures.push(failure);
                }
                Outcome::Cancelled => report.cancelled += 1,
            }
        }

        tracing::info!(
            requested = report.requested,
            fetched = report.fetched(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Price fetches complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn outcomes(report: &FetchReport) -> usize {
        report.fetched() + report.failures.len() + report.cancelled + report.lost
    }

    struct FakeSource {
        failing: HashSet<(String, NaiveDate)>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeSource {
        fn new(failing: &[(&str, &str)]) -> Self {
            Self {
                failing: failing
                    .iter()
                    .map(|(s, d)| (s.to_string(), d.parse().unwrap()))
                    .collect(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn fetch_daily_bar(&self, symbol: &str, date: NaiveDate) -> Result<RawBar, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if symbol == "PANIC" {
                panic!("source blew up");
            }
            if self.failing.contains(&(symbol.to_string(), date)) {
                return Err(AppError::QuoteSource {
                    url: format!("fake://{}/{}", symbol, date),
                    message: "Data not found.".to_string(),
                });
            }
            Ok(RawBar {
                symbol: symbol.to_string(),
                date,
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 100.0,
            })
        }
    }

    fn requests(pairs: &[(&str, &str)]) -> Vec<FetchRequest> {
        pairs
            .iter()
            .map(|(s, d)| FetchRequest {
                symbol: s.to_string(),
                date: d.parse().unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn failures_are_excluded_and_successes_grouped() {
        let source = Arc::new(FakeSource::new(&[("AAPL", "2025-02-04")]));
        let coordinator = FetchCoordinator::new(source.clone(), 0);
        let report = coordinator
            .fetch_all(
                requests(&[
                    ("AAPL", "2025-02-03"),
                    ("AAPL", "2025-02-04"),
                    ("AAPL", "2025-02-05"),
                    ("MSFT", "2025-02-03"),
                ]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.requested, 4);
        assert_eq!(outcomes(&report), 4);
        assert_eq!(report.fetched(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.bars_by_symbol["AAPL"].len(), 2);
        assert_eq!(report.bars_by_symbol["MSFT"].len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn in_flight_requests_respect_the_bound() {
        let source = Arc::new(FakeSource::new(&[]));
        let coordinator = FetchCoordinator::new(source.clone(), 2);
        let days = [
            "2025-02-03", "2025-02-04", "2025-02-05", "2025-02-06", "2025-02-07", "2025-02-10",
        ];
        let pairs: Vec<(&str, &str)> = days.iter().map(|d| ("AAPL", *d)).collect();
        let report = coordinator
            .fetch_all(requests(&pairs), &CancellationToken::new())
            .await;

        assert_eq!(report.fetched(), 6);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_batch_still_reports_every_request() {
        let source = Arc::new(FakeSource::new(&[]));
        let coordinator = FetchCoordinator::new(source.clone(), 1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = coordinator
            .fetch_all(
                requests(&[("AAPL", "2025-02-03"), ("AAPL", "2025-02-04")]),
                &cancel,
            )
            .await;

        assert_eq!(report.cancelled, 2);
        assert_eq!(outcomes(&report), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_task_is_counted_as_lost() {
        let source = Arc::new(FakeSource::new(&[]));
        let coordinator = FetchCoordinator::new(source, 0);
        let report = coordinator
            .fetch_all(
                requests(&[("PANIC", "2025-02-03"), ("AAPL", "2025-02-03")]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.fetched(), 1);
        assert_eq!(report.lost, 1);
        assert_eq!(outcomes(&report), 2);
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let coordinator = FetchCoordinator::new(Arc::new(FakeSource::new(&[])), 4);
        let report = coordinator
            .fetch_all(Vec::new(), &CancellationToken::new())
            .await;
        assert_eq!(report.requested, 0);
        assert_eq!(outcomes(&report), 0);
    }
}
