//! IndexTable: several index series on a shared (outer-joined) date axis.

use super::series::{IndexSeries, SeriesError};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// An ordered collection of uniquely named series.
///
/// Insertion order is the canonical order reported by `names()`. The table is
/// never mutated after construction; a refresh builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexTable {
    series: Vec<IndexSeries>,
}

impl IndexTable {
    /// Build a table, rejecting duplicate series names.
    pub fn new(series: Vec<IndexSeries>) -> Result<Self, SeriesError> {
        let mut seen = HashSet::new();
        for s in &series {
            if !seen.insert(s.name()) {
                return Err(SeriesError::DuplicateName(s.name().to_string()));
            }
        }
        Ok(Self { series })
    }

    /// Caller guarantees names are unique (e.g. they come from a registry).
    pub(crate) fn from_unique_series(series: Vec<IndexSeries>) -> Self {
        debug_assert!(Self::new(series.clone()).is_ok());
        Self { series }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Series names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name()).collect()
    }

    pub fn series(&self) -> &[IndexSeries] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&IndexSeries> {
        self.series.iter().find(|s| s.name() == name)
    }

    /// Number of series (columns).
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// True when no series holds a single observation.
    pub fn has_no_observations(&self) -> bool {
        self.series.iter().all(|s| s.is_empty())
    }

    /// The common date axis: sorted union of every series' dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut all = BTreeSet::new();
        for s in &self.series {
            all.extend(s.observations().iter().map(|o| o.date));
        }
        all.into_iter().collect()
    }

    /// Rows on the common date axis. A series with no reading on a date yields
    /// `None` in that column.
    pub fn rows(&self) -> Vec<(NaiveDate, Vec<Option<f64>>)> {
        self.dates()
            .into_iter()
            .map(|date| {
                let cells = self.series.iter().map(|s| s.value_on(date)).collect();
                (date, cells)
            })
            .collect()
    }

    /// Earliest and latest date across all series.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.series.iter().filter_map(|s| s.first()).map(|o| o.date).min()?;
        let last = self.series.iter().filter_map(|s| s.last()).map(|o| o.date).max()?;
        Some((first, last))
    }

    /// Table containing only the named columns, in the order given.
    /// Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let mut seen = HashSet::new();
        let series = names
            .iter()
            .filter(|n| seen.insert(**n))
            .filter_map(|n| self.get(n).cloned())
            .collect();
        Self { series }
    }

    /// Apply `f` to every column. `f` must keep names unique, which holds for
    /// any transformation that preserves each series' name.
    pub(crate) fn map_series(&self, f: impl FnMut(&IndexSeries) -> IndexSeries) -> Self {
        Self {
            series: self.series.iter().map(f).collect(),
        }
    }
}

impl IntoIterator for IndexTable {
    type Item = IndexSeries;
    type IntoIter = std::vec::IntoIter<IndexSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}
