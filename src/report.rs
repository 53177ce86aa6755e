use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::indicator::candle_pattern::classify;
use crate::indicator::heikin_ashi::replay;
use crate::indicator::sentiment::resolve;
use crate::model::bar::RawBar;
use crate::model::candle::{Ohlc, SmoothedCandle};
use crate::model::signal::{PatternSignals, Sentiment};

const SEPARATOR: &str = "------------------------------------";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("insufficient history for {symbol}: have {have} bars, need {need}")]
pub struct InsufficientHistory {
    pub symbol: String,
    pub have: usize,
    pub need: usize,
}

/// Latest smoothed candle, pattern flags and sentiment for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInsight {
    pub symbol: String,
    pub date: NaiveDate,
    pub candle: SmoothedCandle,
    pub signals: PatternSignals,
    pub sentiment: Sentiment,
}

/// Analyse the newest bar of a window.
///
/// `bars_newest_first` is what the store returns; a window shorter than
/// `window` is declined rather than analysed.
pub fn analyze_symbol(
    symbol: &str,
    bars_newest_first: &[RawBar],
    window: usize,
) -> Result<SymbolInsight, InsufficientHistory> {
    let insufficient = || InsufficientHistory {
        symbol: symbol.to_string(),
        have: bars_newest_first.len(),
        need: window,
    };
    if window == 0 || bars_newest_first.len() != window {
        return Err(insufficient());
    }

    let latest_bar = &bars_newest_first[0];
    let oldest_first: Vec<Ohlc> = bars_newest_first.iter().rev().map(RawBar::ohlc).collect();
    let replayed = replay(&oldest_first).ok_or_else(insufficient)?;

    let signals = classify(&latest_bar.ohlc(), &replayed.previous);
    Ok(SymbolInsight {
        symbol: symbol.to_string(),
        date: latest_bar.date,
        candle: replayed.latest,
        signals,
        sentiment: resolve(&signals),
    })
}

impl fmt::Display for SymbolInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.candle;
        let s = &self.signals;
        writeln!(f, "{}", SEPARATOR)?;
        writeln!(f, "Date: {}", self.date.format("%Y-%m-%d"))?;
        writeln!(f, "Symbol: {}", self.symbol)?;
        writeln!(
            f,
            "OHLC: {:.2}, {:.2}, {:.2}, {:.2}",
            c.open, c.high, c.low, c.close
        )?;
        writeln!(f, "Uptrend: {}", s.is_uptrend)?;
        writeln!(f, "Bull: {}", s.is_bull)?;
        writeln!(f, "Bear: {}", s.is_bear)?;
        writeln!(f, "SpinningTop: {}", s.is_spinning_top)?;
        writeln!(f, "Doji: {}", s.is_doji_star)?;
        writeln!(f, "Grave: {}", s.is_gravestone_doji)?;
        write!(f, "Sentiment: {}", self.sentiment)
    }
}
