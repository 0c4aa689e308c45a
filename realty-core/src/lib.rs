//! Realty Core: real-estate index store, analytics, and acquisition.
//!
//! - Domain types (observations, index series, index tables)
//! - `IndexDataStore`: cached table loading, date filtering, change
//!   summaries, correlation, normalization, CSV export
//! - `IndexFetcher`: source registry, download/scrape/poll strategies,
//!   pluggable transports, paced batch fetching
//! - TOML application configuration

pub mod calendar;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use domain::{IndexSeries, IndexTable, Observation};
pub use fetch::{FetchError, IndexFetcher};
pub use store::{IndexDataStore, StoreError};
