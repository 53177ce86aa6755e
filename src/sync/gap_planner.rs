use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Weekdays only; holidays surface later as fetch failures.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Trading days strictly after `watermark` and strictly before `today`, oldest first.
/// Today's bar may not be final, so it is never planned.
pub fn missing_trading_days(watermark: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut day = match watermark.succ_opt() {
        Some(d) => d,
        None => return out,
    };
    while day < today {
        if is_trading_day(day) {
            out.push(day);
        }
        day = match day.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    out
}

/// The `n` most recent trading days before `today`, oldest first.
pub fn bootstrap_window(n: usize, today: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut day = today;
    while out.len() < n {
        day = match day.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => break,
        };
        if is_trading_day(day) {
            out.push(day);
        }
    }
    out.reverse();
    out
}
