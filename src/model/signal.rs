use std::fmt;

/// Candle-shape flags for one bar measured against the prior smoothed candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternSignals {
    pub is_uptrend: bool,
    pub is_bull: bool,
    pub is_bear: bool,
    pub is_spinning_top: bool,
    pub is_doji_star: bool,
    pub is_gravestone_doji: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Buy,
    Sell,
    HoldSell,
    StrongSell,
    HoldAdd,
    Hold,
    NoAction,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::HoldSell => "hold, sell",
            Self::StrongSell => "SELL",
            Self::HoldAdd => "hold, add",
            Self::Hold => "hold",
            Self::NoAction => "no action",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
