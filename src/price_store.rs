use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::model::bar::RawBar;
use crate::model::symbol::{epoch_watermark, SymbolRecord};

const DATE_FMT: &str = "%Y-%m-%d";

/// Persistence for tracked symbols and their daily bars.
///
/// Bars are unique per (symbol, date) and never rewritten. The per-symbol
/// watermark only moves forward, and only together with the bars that justify it.
pub trait PriceStore: Send + Sync {
    /// Get-or-create. New symbols start at `bootstrap_watermark`, or the epoch.
    fn ensure_symbol(
        &self,
        ticker: &str,
        bootstrap_watermark: Option<NaiveDate>,
    ) -> Result<SymbolRecord, AppError>;

    fn get_symbol(&self, ticker: &str) -> Result<Option<SymbolRecord>, AppError>;

    fn list_symbols(&self) -> Result<Vec<SymbolRecord>, AppError>;

    /// Insert new bars and advance the watermark to the latest inserted date.
    /// Empty input is rejected with [`AppError::NoData`] and touches nothing.
    fn insert_bars(&self, ticker: &str, bars: &[RawBar]) -> Result<usize, AppError>;

    /// Up to `limit` bars dated on or before `as_of`, newest first.
    fn query_bars(
        &self,
        ticker: &str,
        limit: usize,
        as_of: NaiveDate,
    ) -> Result<Vec<RawBar>, AppError>;
}

pub struct SqlitePriceStore {
    conn: Mutex<Connection>,
}

impl SqlitePriceStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS symbols (
                ticker TEXT NOT NULL PRIMARY KEY,
                last_fetched_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS prices (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY(symbol, date)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-transaction rolls back on drop, so the connection is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn symbol_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SymbolRecord> {
    Ok(SymbolRecord {
        ticker: row.get(0)?,
        last_fetched_date: parse_date(1, row.get(1)?)?,
    })
}

fn select_symbol(conn: &Connection, ticker: &str) -> rusqlite::Result<Option<SymbolRecord>> {
    conn.query_row(
        "SELECT ticker, last_fetched_date FROM symbols WHERE ticker = ?1",
        [ticker],
        symbol_from_row,
    )
    .optional()
}

fn get_or_create_symbol(
    conn: &Connection,
    ticker: &str,
    bootstrap_watermark: Option<NaiveDate>,
) -> rusqlite::Result<SymbolRecord> {
    let watermark = bootstrap_watermark.unwrap_or_else(epoch_watermark);
    conn.execute(
        "INSERT INTO symbols (ticker, last_fetched_date) VALUES (?1, ?2) ON CONFLICT(ticker) DO NOTHING",
        params![ticker, format_date(watermark)],
    )?;
    conn.query_row(
        "SELECT ticker, last_fetched_date FROM symbols WHERE ticker = ?1",
        [ticker],
        symbol_from_row,
    )
}

impl PriceStore for SqlitePriceStore {
    fn ensure_symbol(
        &self,
        ticker: &str,
        bootstrap_watermark: Option<NaiveDate>,
    ) -> Result<SymbolRecord, AppError> {
        let conn = self.lock();
        Ok(get_or_create_symbol(&conn, ticker, bootstrap_watermark)?)
    }

    fn get_symbol(&self, ticker: &str) -> Result<Option<SymbolRecord>, AppError> {
        let conn = self.lock();
        Ok(select_symbol(&conn, ticker)?)
    }

    fn list_symbols(&self) -> Result<Vec<SymbolRecord>, AppError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT ticker, last_fetched_date FROM symbols ORDER BY ticker ASC")?;
        let rows = stmt.query_map([], symbol_from_row)?;
        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row?);
        }
        Ok(symbols)
    }

    fn insert_bars(&self, ticker: &str, bars: &[RawBar]) -> Result<usize, AppError> {
        if bars.is_empty() {
            return Err(AppError::NoData {
                symbol: ticker.to_string(),
            });
        }
        if let Some(stray) = bars.iter().find(|b| b.symbol != ticker) {
            return Err(AppError::InvalidTicker(format!(
                "bar for {} in batch for {}",
                stray.symbol, ticker
            )));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        get_or_create_symbol(&tx, ticker, None)?;

        let mut inserted = 0usize;
        let mut latest: Option<NaiveDate> = None;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO prices (symbol, date, open, high, low, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(symbol, date) DO NOTHING
                "#,
            )?;
            for bar in bars {
                let changed = stmt.execute(params![
                    ticker,
                    format_date(bar.date),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ])?;
                if changed > 0 {
                    inserted += changed;
                    latest = latest.max(Some(bar.date));
                }
            }
        }

        if let Some(latest) = latest {
            // Advance-if-greater in one statement; ISO dates compare correctly as text.
            tx.execute(
                "UPDATE symbols SET last_fetched_date = ?2 WHERE ticker = ?1 AND last_fetched_date < ?2",
                params![ticker, format_date(latest)],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            symbol = ticker,
            requested = bars.len(),
            inserted,
            latest = ?latest,
            "Bars committed"
        );
        Ok(inserted)
    }

    fn query_bars(
        &self,
        ticker: &str,
        limit: usize,
        as_of: NaiveDate,
    ) -> Result<Vec<RawBar>, AppError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT symbol, date, open, high, low, close, volume
            FROM prices
            WHERE symbol = ?1 AND date <= ?2
            ORDER BY date DESC
            LIMIT ?3
            "#,
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![ticker, format_date(as_of), limit], |row| {
            Ok(RawBar {
                symbol: row.get(0)?,
                date: parse_date(1, row.get(1)?)?,
                open: row.get(2)?,
                high: row.get(3)?,
                low: row.get(4)?,
                close: row.get(5)?,
                volume: row.get(6)?,
            })
        })?;
        let mut bars = Vec::new();
        for row in rows {
            bars.push(row?);
        }
        Ok(bars)
    }
}
