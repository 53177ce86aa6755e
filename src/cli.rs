use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stonk-tracker")]
#[command(about = "Daily price sync and Heikin-Ashi sentiment for tracked symbols", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sync every tracked symbol from its watermark up to yesterday
    Refresh,

    /// Start tracking a symbol, fetching its recent trading history
    Add {
        /// Ticker to add, e.g. AAPL
        symbol: String,
    },

    /// Print the latest smoothed candle, patterns and sentiment per symbol
    Info,

    /// List tracked symbols and their watermarks
    Symbols,
}
