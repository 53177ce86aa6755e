pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod indicator;
pub mod model;
pub mod polygon;
pub mod price_store;
pub mod quote_source;
pub mod report;
pub mod sync;
