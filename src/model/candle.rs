/// Open/high/low/close of a single raw bar, the input to the Heikin-Ashi recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// A Heikin-Ashi candle. Never persisted; rebuilt by replaying raw bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedCandle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}
