//! Process wiring for the `countrydle` binary: configuration, startup retry,
//! vector-index initialisation, catalog seeding and the daily jobs.

pub mod config;
pub mod index;
pub mod jobs;
pub mod retry;
pub mod seed;

pub use config::ServerConfig;
