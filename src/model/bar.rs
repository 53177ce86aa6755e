use chrono::NaiveDate;

use super::candle::Ohlc;

/// One trading day of raw price data for a symbol. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn ohlc(&self) -> Ohlc {
        Ohlc {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

/// Sort bars oldest-first; fetch results arrive in no particular order.
pub fn sort_oldest_first(bars: &mut [RawBar]) {
    bars.sort_by_key(|b| b.date);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str) -> RawBar {
        RawBar {
            symbol: "AAPL".to_string(),
            date: date.parse().unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
        }
    }

    #[test]
    fn sorts_oldest_first() {
        let mut bars = vec![bar("2025-02-05"), bar("2025-02-03"), bar("2025-02-04")];
        sort_oldest_first(&mut bars);
        let dates: Vec<String> = bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-02-03", "2025-02-04", "2025-02-05"]);
    }
}
