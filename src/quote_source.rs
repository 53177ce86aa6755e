use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::model::bar::RawBar;

/// Anything that can produce one daily bar for a symbol.
///
/// A failure is an ordinary outcome: market holidays come back as errors that
/// look the same as any other.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_daily_bar(&self, symbol: &str, date: NaiveDate) -> Result<RawBar, AppError>;
}
