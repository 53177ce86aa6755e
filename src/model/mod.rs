pub mod bar;
pub mod candle;
pub mod signal;
pub mod symbol;
