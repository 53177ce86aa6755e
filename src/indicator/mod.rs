pub mod candle_pattern;
pub mod heikin_ashi;
pub mod sentiment;
