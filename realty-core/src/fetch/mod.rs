//! Index acquisition: a registry of sources, three strategies (download,
//! scrape, poll), pluggable transports, and the batch fetcher.

pub mod error;
pub mod fetcher;
pub mod parse;
pub mod progress;
pub mod registry;
pub mod strategy;
pub mod synthetic;
pub mod transport;

pub use error::FetchError;
pub use fetcher::{FetchState, FetchSummary, IndexFetcher, DEFAULT_PACING};
pub use progress::{FetchProgress, LogProgress, NoProgress};
pub use registry::{SourceDescriptor, SourceRegistry};
pub use strategy::{Strategy, StrategyKind};
pub use synthetic::SyntheticTransport;
pub use transport::{HttpTransport, Request, Transport, DEFAULT_USER_AGENT};
