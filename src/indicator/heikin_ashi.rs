use crate::model::candle::{Ohlc, SmoothedCandle};

/// `(prev.open + prev.close) / 2`, where `prev` is the prior smoothed candle.
pub fn ha_open(prev: &SmoothedCandle) -> f64 {
    (prev.open + prev.close) / 2.0
}

/// `(open + close + high + low) / 4` of the raw bar.
pub fn ha_close(price: &Ohlc) -> f64 {
    (price.open + price.close + price.high + price.low) / 4.0
}

pub fn ha_high(price: &Ohlc, prev: &SmoothedCandle) -> f64 {
    ha_open(prev).max(ha_close(price)).max(price.high)
}

pub fn ha_low(price: &Ohlc, prev: &SmoothedCandle) -> f64 {
    ha_open(prev).min(ha_close(price)).min(price.low)
}

/// Smooth one raw bar against the prior smoothed candle.
pub fn smooth(price: &Ohlc, prev: &SmoothedCandle) -> SmoothedCandle {
    SmoothedCandle {
        open: ha_open(prev),
        high: ha_high(price, prev),
        low: ha_low(price, prev),
        close: ha_close(price),
    }
}

/// Bootstrap predecessor for the oldest bar of a run, built from its own prices.
pub fn seed(price: &Ohlc) -> SmoothedCandle {
    SmoothedCandle {
        open: price.open,
        high: price.high,
        low: price.low,
        close: price.close,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeikinAshiReplay {
    /// Smoothed candle of the newest bar.
    pub latest: SmoothedCandle,
    /// Smoothed candle the newest bar was computed against.
    pub previous: SmoothedCandle,
}

/// Fold a run of bars ordered oldest-to-newest; each candle depends on the one
/// before it. Returns `None` for an empty run.
pub fn replay(bars: &[Ohlc]) -> Option<HeikinAshiReplay> {
    let first = bars.first()?;
    let start = seed(first);
    let (previous, latest) = bars
        .iter()
        .fold((start, start), |(_, prev), price| (prev, smooth(price, &prev)));
    Some(HeikinAshiReplay { latest, previous })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::candle_pattern::truncate_cents;

    fn fixture() -> Ohlc {
        Ohlc {
            open: 162.96,
            high: 163.4,
            low: 158.58,
            close: 160.84,
        }
    }

    #[test]
    fn close_of_known_bar() {
        assert_eq!(truncate_cents(ha_close(&fixture())), 16144);
    }

    #[test]
    fn open_of_known_prior_candle() {
        let prev = SmoothedCandle {
            open: 163.69,
            high: 170.74,
            low: 160.87,
            close: 165.15,
        };
        assert_eq!(truncate_cents(ha_open(&prev)), 16442);
    }

    #[test]
    fn seeded_high_and_low_follow_raw_extremes() {
        let price = fixture();
        let prev = seed(&price);
        assert_eq!(truncate_cents(ha_high(&price, &prev)), 16340);
        assert_eq!(truncate_cents(ha_low(&price, &prev)), 15858);
    }

    #[test]
    fn replay_of_empty_run_is_none() {
        assert!(replay(&[]).is_none());
    }

    #[test]
    fn single_bar_replay_uses_seed_as_previous() {
        let price = fixture();
        let out = replay(&[price]).unwrap();
        assert_eq!(out.previous, seed(&price));
        assert_eq!(out.latest, smooth(&price, &seed(&price)));
    }

    #[test]
    fn replay_matches_step_by_step_smoothing() {
        let bars = vec![
            fixture(),
            Ohlc {
                open: 161.0,
                high: 165.0,
                low: 160.5,
                close: 164.2,
            },
            Ohlc {
                open: 164.0,
                high: 166.1,
                low: 163.0,
                close: 163.5,
            },
        ];
        let day1 = smooth(&bars[0], &seed(&bars[0]));
        let day2 = smooth(&bars[1], &day1);
        let day3 = smooth(&bars[2], &day2);
        let out = replay(&bars).unwrap();
        assert_eq!(out.latest, day3);
        assert_eq!(out.previous, day2);
        // Second candle opens at the midpoint of the first smoothed candle.
        assert!((day2.open - (day1.open + day1.close) / 2.0).abs() < 1e-12);
    }
}
