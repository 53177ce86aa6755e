use chrono::NaiveDate;

/// A tracked ticker and its sync watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub ticker: String,
    /// Inclusive upper bound of trading days already synchronized.
    pub last_fetched_date: NaiveDate,
}

/// Watermark given to symbols created without an explicit bootstrap date.
pub fn epoch_watermark() -> NaiveDate {
    NaiveDate::default()
}
