use crate::indicator::heikin_ashi::smooth;
use crate::model::candle::{Ohlc, SmoothedCandle};
use crate::model::signal::PatternSignals;

const DOJI_MAX_BODY_PCT: f64 = 5.0;
const GRAVESTONE_MAX_CLOSE_PCT: f64 = 5.0;
const SPINNING_TOP_MIN_BODY_PCT: f64 = 5.0;
const SPINNING_TOP_MAX_BODY_PCT: f64 = 20.0;

/// Price in whole cents, truncated toward zero.
pub fn truncate_cents(value: f64) -> i64 {
    (value * 100.0) as i64
}

/// Body as a percentage of the daily range. NaN when the range is zero.
fn body_pct(candle: &SmoothedCandle) -> f64 {
    let daily_range = candle.high - candle.low;
    (candle.close - candle.open).abs() / daily_range * 100.0
}

fn touches_extreme(candle: &SmoothedCandle) -> bool {
    let high = truncate_cents(candle.high);
    let low = truncate_cents(candle.low);
    let open = truncate_cents(candle.open);
    let close = truncate_cents(candle.close);
    high == close || high == open || low == close || low == open
}

pub fn is_doji_star(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    body_pct(&smooth(price, prev)) < DOJI_MAX_BODY_PCT
}

pub fn is_gravestone_doji(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    if !is_doji_star(price, prev) {
        return false;
    }
    let candle = smooth(price, prev);
    let daily_range = candle.high - candle.low;
    (candle.close - candle.low).abs() / daily_range * 100.0 < GRAVESTONE_MAX_CLOSE_PCT
}

/// Small body strictly between the doji and spinning-top bounds that does not
/// sit on either extreme of the range.
pub fn is_spinning_top(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    let candle = smooth(price, prev);
    let pct = body_pct(&candle);
    if pct > SPINNING_TOP_MIN_BODY_PCT && pct < SPINNING_TOP_MAX_BODY_PCT {
        return !touches_extreme(&candle);
    }
    false
}

pub fn is_uptrend(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    let candle = smooth(price, prev);
    candle.close - candle.open >= 0.0
}

pub fn is_bull(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    let candle = smooth(price, prev);
    candle.open < candle.close && truncate_cents(candle.open) == truncate_cents(candle.low)
}

pub fn is_bear(price: &Ohlc, prev: &SmoothedCandle) -> bool {
    let candle = smooth(price, prev);
    candle.close < candle.open && truncate_cents(candle.open) == truncate_cents(candle.high)
}

/// All pattern flags for a raw bar, measured on the Heikin-Ashi candle it
/// produces against `prev`. Extreme checks compare truncated cents.
pub fn classify(price: &Ohlc, prev: &SmoothedCandle) -> PatternSignals {
    PatternSignals {
        is_uptrend: is_uptrend(price, prev),
        is_bull: is_bull(price, prev),
        is_bear: is_bear(price, prev),
        is_spinning_top: is_spinning_top(price, prev),
        is_doji_star: is_doji_star(price, prev),
        is_gravestone_doji: is_gravestone_doji(price, prev),
    }
}
