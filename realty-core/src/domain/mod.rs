//! Domain types: index series, tables, and cache identities.

pub mod ids;
pub mod series;
pub mod table;

pub use ids::CacheKey;
pub use series::{IndexSeries, Observation, SeriesError};
pub use table::IndexTable;
