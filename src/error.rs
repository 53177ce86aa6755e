use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("quote source error: url: {url}, message: {message}")]
    QuoteSource { url: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data to insert for symbol {symbol}")]
    NoData { symbol: String },

    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// True for the empty-batch condition, as opposed to an infrastructure failure.
    pub fn is_no_data(&self) -> bool {
        matches!(self, AppError::NoData { .. })
    }
}
