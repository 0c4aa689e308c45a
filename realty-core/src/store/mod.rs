//! IndexDataStore: owns the canonical index table and serves filtered views
//! and derived metrics to presentation code.
//!
//! The table comes from a `TableSource` (the built-in sample dataset, or a
//! table assembled by the fetcher) and is cached under the source's
//! `CacheKey` until explicitly invalidated.

pub mod analytics;
pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod sample;

pub use analytics::{
    compute_change_summary, compute_correlation, compute_normalized, ChangeReport,
    ChangeSummary, CorrelationMatrix, NormalizedReport,
};
pub use cache::TableCache;
pub use error::StoreError;
pub use export::{to_csv_string, write_csv, write_csv_file};
pub use filter::{available_indices, filter_by_date_range};
pub use sample::{SampleConfig, SampleDataset};

use crate::domain::{CacheKey, IndexTable};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Producer of a complete index table.
///
/// `cache_key` must change whenever `produce` could return a different table.
pub trait TableSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fingerprint of the source configuration.
    fn cache_key(&self) -> CacheKey;

    /// Build the table from scratch.
    fn produce(&self) -> Result<IndexTable, StoreError>;
}

/// A table handed in from outside (e.g. the result of a fetch run).
///
/// The cache key is a content hash, so swapping in different data never
/// reuses a stale entry.
#[derive(Debug, Clone)]
pub struct FixedTable {
    table: IndexTable,
    key: CacheKey,
}

impl FixedTable {
    pub fn new(table: IndexTable) -> Self {
        let key = content_key(&table);
        Self { table, key }
    }
}

impl TableSource for FixedTable {
    fn name(&self) -> &str {
        "fixed"
    }

    fn cache_key(&self) -> CacheKey {
        self.key.clone()
    }

    fn produce(&self) -> Result<IndexTable, StoreError> {
        Ok(self.table.clone())
    }
}

/// BLAKE3 over names, dates and value bits in table order.
fn content_key(table: &IndexTable) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    for series in table.series() {
        hasher.update(series.name().as_bytes());
        hasher.update(&[0]);
        for obs in series.observations() {
            hasher.update(obs.date.to_string().as_bytes());
            hasher.update(&obs.value.to_le_bytes());
        }
    }
    CacheKey(hasher.finalize().to_hex().to_string())
}

/// The index store.
pub struct IndexDataStore {
    source: Box<dyn TableSource>,
    cache: TableCache,
}

impl IndexDataStore {
    pub fn new(source: impl TableSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: TableCache::new(),
        }
    }

    /// Store over the built-in sample dataset with default parameters.
    pub fn sample() -> Self {
        Self::new(SampleDataset::default())
    }

    /// Return the cached table or produce and cache it.
    ///
    /// Repeated calls without an intervening `invalidate` return the same
    /// shared table. Fails with `DataUnavailable` if the source yields no
    /// series or only empty ones.
    pub fn load(&self) -> Result<Arc<IndexTable>, StoreError> {
        let key = self.source.cache_key();
        if let Some(table) = self.cache.get(&key) {
            debug!(source = self.source.name(), key = key.short(), "table cache hit");
            return Ok(table);
        }

        let table = self.source.produce()?;
        if table.is_empty() || table.has_no_observations() {
            warn!(source = self.source.name(), "source produced no observations");
            return Err(StoreError::DataUnavailable);
        }

        info!(
            source = self.source.name(),
            key = key.short(),
            indices = table.len(),
            "loaded index table"
        );
        Ok(self.cache.put(key, table))
    }

    /// Drop the cached table for the current source.
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(&self.source.cache_key())
    }

    /// Invalidate and reload.
    pub fn refresh(&self) -> Result<Arc<IndexTable>, StoreError> {
        self.invalidate();
        self.load()
    }

    /// Swap in a new source (e.g. a freshly fetched table). The whole cache is
    /// cleared; the next `load` produces from the new source.
    pub fn replace_source(&mut self, source: impl TableSource + 'static) {
        self.cache.clear();
        self.source = Box::new(source);
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IndexSeries, Observation};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often the table is built.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        table: IndexTable,
    }

    impl TableSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn cache_key(&self) -> CacheKey {
            CacheKey::from_bytes(b"counting")
        }

        fn produce(&self) -> Result<IndexTable, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.clone())
        }
    }

    fn one_series_table() -> IndexTable {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        IndexTable::new(vec![
            IndexSeries::new("rent", vec![Observation::new(date, 100.0)]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn load_is_cached_until_invalidated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = IndexDataStore::new(CountingSource {
            calls: Arc::clone(&calls),
            table: one_series_table(),
        });

        let a = store.load().unwrap();
        let b = store.load().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = store.refresh().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*a, *c);
    }

    #[test]
    fn empty_source_is_unavailable() {
        let store = IndexDataStore::new(FixedTable::new(IndexTable::empty()));
        assert_eq!(store.load().unwrap_err(), StoreError::DataUnavailable);

        let all_empty = IndexTable::new(vec![IndexSeries::empty("rent")]).unwrap();
        let store = IndexDataStore::new(FixedTable::new(all_empty));
        assert_eq!(store.load().unwrap_err(), StoreError::DataUnavailable);
    }

    #[test]
    fn replace_source_swaps_table() {
        let mut store = IndexDataStore::sample();
        assert_eq!(store.load().unwrap().len(), 5);

        store.replace_source(FixedTable::new(one_series_table()));
        assert_eq!(store.load().unwrap().names(), vec!["rent"]);
        assert_eq!(store.source_name(), "fixed");
    }

    #[test]
    fn content_key_tracks_values() {
        let a = FixedTable::new(one_series_table());
        let b = FixedTable::new(one_series_table());
        assert_eq!(a.cache_key(), b.cache_key());

        let other = IndexTable::new(vec![IndexSeries::new(
            "rent",
            vec![Observation::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 101.0)],
        )
        .unwrap()])
        .unwrap();
        assert_ne!(a.cache_key(), FixedTable::new(other).cache_key());
    }
}
