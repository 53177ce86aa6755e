use crate::model::signal::{PatternSignals, Sentiment};

/// Resolve a single sentiment from pattern flags.
///
/// Rules are checked top to bottom and the first match wins, so the order
/// matters: a doji in an uptrend reads as `sell` even if the bar is also bearish.
pub fn resolve(signals: &PatternSignals) -> Sentiment {
    let s = signals;
    if !s.is_uptrend && s.is_doji_star {
        return Sentiment::Buy;
    }
    if s.is_uptrend && s.is_doji_star {
        return Sentiment::Sell;
    }
    if s.is_uptrend && s.is_spinning_top {
        return Sentiment::HoldSell;
    }
    if s.is_bear {
        return Sentiment::StrongSell;
    }
    if s.is_bull {
        return Sentiment::HoldAdd;
    }
    if s.is_gravestone_doji {
        return Sentiment::Sell;
    }
    if !s.is_uptrend {
        return Sentiment::Sell;
    }
    if s.is_uptrend {
        return Sentiment::Hold;
    }
    Sentiment::NoAction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> PatternSignals {
        PatternSignals::default()
    }

    #[test]
    fn doji_direction_decides_first() {
        let down_doji = PatternSignals {
            is_doji_star: true,
            is_bull: true,
            ..flags()
        };
        assert_eq!(resolve(&down_doji), Sentiment::Buy);

        let up_doji = PatternSignals {
            is_uptrend: true,
            is_doji_star: true,
            is_bear: true,
            ..flags()
        };
        assert_eq!(resolve(&up_doji), Sentiment::Sell);
    }

    #[test]
    fn spinning_top_only_counts_in_uptrend() {
        let up = PatternSignals {
            is_uptrend: true,
            is_spinning_top: true,
            is_bull: true,
            ..flags()
        };
        assert_eq!(resolve(&up), Sentiment::HoldSell);

        let down = PatternSignals {
            is_spinning_top: true,
            ..flags()
        };
        assert_eq!(resolve(&down), Sentiment::Sell);
    }

    #[test]
    fn bear_beats_bull_and_gravestone() {
        let s = PatternSignals {
            is_bear: true,
            is_bull: true,
            is_gravestone_doji: true,
            ..flags()
        };
        assert_eq!(resolve(&s), Sentiment::StrongSell);
        assert_eq!(resolve(&s).to_string(), "SELL");
    }

    #[test]
    fn bull_then_fallbacks() {
        let bull = PatternSignals {
            is_uptrend: true,
            is_bull: true,
            ..flags()
        };
        assert_eq!(resolve(&bull).to_string(), "hold, add");

        let plain_up = PatternSignals {
            is_uptrend: true,
            ..flags()
        };
        assert_eq!(resolve(&plain_up), Sentiment::Hold);
        assert_eq!(resolve(&flags()), Sentiment::Sell);
    }
}
