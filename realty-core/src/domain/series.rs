//! IndexSeries: a named, date-ordered sequence of index values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single index reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Construction errors for series and tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series '{name}': dates must be strictly increasing ({previous} then {next})")]
    NotAscending {
        name: String,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("series '{name}': non-finite value on {date}")]
    NonFinite { name: String, date: NaiveDate },

    #[error("duplicate index name '{0}'")]
    DuplicateName(String),

    #[error("index name must not be empty")]
    EmptyName,
}

/// A named index series.
///
/// Invariant: observation dates are strictly increasing (sorted, unique) and
/// every value is finite. Both constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSeries {
    name: String,
    observations: Vec<Observation>,
}

impl IndexSeries {
    /// Build a series from observations that are already in canonical order.
    pub fn new(
        name: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, SeriesError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeriesError::EmptyName);
        }
        for obs in &observations {
            if !obs.value.is_finite() {
                return Err(SeriesError::NonFinite {
                    name,
                    date: obs.date,
                });
            }
        }
        for pair in observations.windows(2) {
            if pair[0].date >= pair[1].date {
                return Err(SeriesError::NotAscending {
                    name,
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { name, observations })
    }

    /// Build a series from raw points: sort by date, keep the last value seen
    /// for a repeated date, drop non-finite values.
    pub fn canonicalize(
        name: impl Into<String>,
        mut observations: Vec<Observation>,
    ) -> Result<Self, SeriesError> {
        observations.retain(|o| o.value.is_finite());
        // Stable sort keeps arrival order within a date, so the last arrival wins below.
        observations.sort_by_key(|o| o.date);

        let mut canonical: Vec<Observation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match canonical.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => canonical.push(obs),
            }
        }
        Self::new(name, canonical)
    }

    /// A series with no observations (e.g. after filtering everything out).
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Value on an exact date, if present.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| self.observations[i].value)
    }

    /// Observations with `start <= date <= end`. Callers guarantee `start <= end`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> &[Observation] {
        let lo = self.observations.partition_point(|o| o.date < start);
        let hi = self.observations.partition_point(|o| o.date <= end);
        if lo >= hi {
            &[]
        } else {
            &self.observations[lo..hi]
        }
    }

    /// Copy of this series restricted to `[start, end]`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: self.name.clone(),
            observations: self.slice(start, end).to_vec(),
        }
    }

    /// Keep only observations matching `keep`. Order is preserved, so the
    /// invariant still holds.
    pub fn filtered(&self, mut keep: impl FnMut(&Observation) -> bool) -> Self {
        Self {
            name: self.name.clone(),
            observations: self.observations.iter().copied().filter(|o| keep(o)).collect(),
        }
    }

    /// Replace every value through `f`. Fails if `f` produces a non-finite value.
    pub fn map_values(&self, mut f: impl FnMut(f64) -> f64) -> Result<Self, SeriesError> {
        let observations = self
            .observations
            .iter()
            .map(|o| Observation::new(o.date, f(o.value)))
            .collect();
        Self::new(self.name.clone(), observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn obs(date: &str, value: f64) -> Observation {
        Observation::new(d(date), value)
    }

    #[test]
    fn new_rejects_unsorted_dates() {
        let err = IndexSeries::new(
            "rent",
            vec![obs("2024-02-01", 1.0), obs("2024-01-01", 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::NotAscending { .. }));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = IndexSeries::new(
            "rent",
            vec![obs("2024-01-01", 1.0), obs("2024-01-01", 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::NotAscending { .. }));
    }

    #[test]
    fn new_rejects_empty_name() {
        assert_eq!(
            IndexSeries::new("  ", vec![]).unwrap_err(),
            SeriesError::EmptyName
        );
    }

    #[test]
    fn canonicalize_sorts_dedupes_and_drops_nan() {
        let series = IndexSeries::canonicalize(
            "rent",
            vec![
                obs("2024-03-01", 3.0),
                obs("2024-01-01", 1.0),
                obs("2024-02-01", f64::NAN),
                obs("2024-03-01", 4.0),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[0], obs("2024-01-01", 1.0));
        // Later arrival wins for a repeated date
        assert_eq!(series.observations()[1], obs("2024-03-01", 4.0));
    }

    #[test]
    fn slice_is_inclusive_on_both_ends() {
        let series = IndexSeries::new(
            "rent",
            vec![
                obs("2024-01-01", 1.0),
                obs("2024-02-01", 2.0),
                obs("2024-03-01", 3.0),
            ],
        )
        .unwrap();

        let slice = series.slice(d("2024-01-01"), d("2024-02-01"));
        assert_eq!(slice.len(), 2);
        assert!(series.slice(d("2025-01-01"), d("2025-12-31")).is_empty());
        assert_eq!(series.value_on(d("2024-03-01")), Some(3.0));
        assert_eq!(series.value_on(d("2024-03-02")), None);
    }
}
