pub mod credentials;
pub mod rest;
pub mod types;
