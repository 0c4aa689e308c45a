//! Derived metrics over a selection of indices and a date range.
//!
//! Every function here is pure: table and selection in, report out. Batch
//! functions isolate per-index failures so one bad column never hides the
//! results for the others.

use super::error::StoreError;
use super::filter::check_range;
use crate::domain::{IndexSeries, IndexTable, Observation};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// Start/end values and percent change of one index over a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub index: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: f64,
    pub end_value: f64,
    pub percent_change: f64,
}

/// Partial results of a change computation plus the indices that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeReport {
    pub summaries: Vec<ChangeSummary>,
    pub failures: Vec<(String, StoreError)>,
}

impl ChangeReport {
    pub fn get(&self, index: &str) -> Option<&ChangeSummary> {
        self.summaries.iter().find(|s| s.index == index)
    }

    pub fn failure(&self, index: &str) -> Option<&StoreError> {
        self.failures
            .iter()
            .find(|(name, _)| name == index)
            .map(|(_, e)| e)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pearson correlation coefficients between selected indices.
///
/// `values[i][j]` is the coefficient between `names[i]` and `names[j]`.
/// The matrix is symmetric with a unit diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Number of dates shared by every selected series in range.
    pub overlap: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

/// Rebased series plus the indices that could not be rebased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedReport {
    pub table: IndexTable,
    pub failures: Vec<(String, StoreError)>,
}

/// Percent change between the first and last in-range observation of each
/// selected index.
pub fn compute_change_summary(
    table: &IndexTable,
    names: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ChangeReport, StoreError> {
    check_range(start, end)?;

    let mut report = ChangeReport::default();
    for name in unique(names) {
        match change_for(table, name, start, end) {
            Ok(summary) => report.summaries.push(summary),
            Err(e) => report.failures.push((name.to_string(), e)),
        }
    }
    Ok(report)
}

fn change_for(
    table: &IndexTable,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ChangeSummary, StoreError> {
    let series = lookup(table, name)?;
    let points = series.slice(start, end);
    let (first, last) = match points {
        [first, .., last] => (first, last),
        _ => {
            return Err(StoreError::InsufficientData {
                index: name.to_string(),
                required: 2,
                found: points.len(),
            })
        }
    };

    if first.value == 0.0 {
        return Err(StoreError::InvalidOperation {
            index: name.to_string(),
            reason: format!("start value on {} is zero", first.date),
        });
    }

    let percent_change = (last.value - first.value) / first.value * 100.0;
    if !percent_change.is_finite() {
        return Err(StoreError::InvalidOperation {
            index: name.to_string(),
            reason: format!("percent change from {} is not finite", first.date),
        });
    }

    Ok(ChangeSummary {
        index: name.to_string(),
        start_date: first.date,
        end_date: last.date,
        start_value: first.value,
        end_value: last.value,
        percent_change,
    })
}

/// Pearson correlation over the dates present in every selected series
/// within `[start, end]`.
pub fn compute_correlation(
    table: &IndexTable,
    names: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CorrelationMatrix, StoreError> {
    check_range(start, end)?;

    let selected = unique(names);
    if selected.len() < 2 {
        return Err(StoreError::InsufficientData {
            index: selected.join(", "),
            required: 2,
            found: selected.len(),
        });
    }

    let slices = selected
        .iter()
        .map(|name| lookup(table, name).map(|s| s.slice(start, end)))
        .collect::<Result<Vec<_>, _>>()?;

    let overlap = common_dates(&slices);
    if overlap.len() < 2 {
        return Err(StoreError::InsufficientData {
            index: selected.join(", "),
            required: 2,
            found: overlap.len(),
        });
    }

    // Column vectors aligned on the overlap
    let columns: Vec<Vec<f64>> = slices
        .iter()
        .map(|points| {
            overlap
                .iter()
                .filter_map(|date| value_at(points, *date))
                .collect()
        })
        .collect();

    let deviations: Vec<(Vec<f64>, f64)> = columns
        .iter()
        .zip(&selected)
        .map(|(col, name)| {
            let mean = mean_f64(col);
            let dev: Vec<f64> = col.iter().map(|v| v - mean).collect();
            // Scaled to unit max so squaring neither overflows nor underflows
            let scale = dev.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
            if scale == 0.0 {
                Err(StoreError::InvalidOperation {
                    index: name.to_string(),
                    reason: "series is constant over the overlap; correlation undefined".into(),
                })
            } else if !scale.is_finite() {
                Err(StoreError::InvalidOperation {
                    index: name.to_string(),
                    reason: "deviations from the mean overflow".into(),
                })
            } else {
                let dev: Vec<f64> = dev.iter().map(|d| d / scale).collect();
                let norm = dev.iter().map(|d| d * d).sum::<f64>().sqrt();
                Ok((dev, norm))
            }
        })
        .collect::<Result<_, _>>()?;

    let n = selected.len();
    let mut values = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let (dev_i, norm_i) = &deviations[i];
            let (dev_j, norm_j) = &deviations[j];
            let cov: f64 = dev_i.iter().zip(dev_j).map(|(a, b)| a * b).sum();
            let r = (cov / (norm_i * norm_j)).clamp(-1.0, 1.0);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        names: selected.iter().map(|s| s.to_string()).collect(),
        values,
        overlap: overlap.len(),
    })
}

/// Rebase each selected series so its first in-range value is 100.
pub fn compute_normalized(
    table: &IndexTable,
    names: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<NormalizedReport, StoreError> {
    check_range(start, end)?;

    let mut series = Vec::new();
    let mut failures = Vec::new();
    for name in unique(names) {
        match normalize_one(table, name, start, end) {
            Ok(s) => series.push(s),
            Err(e) => failures.push((name.to_string(), e)),
        }
    }

    Ok(NormalizedReport {
        table: IndexTable::new(series)?,
        failures,
    })
}

fn normalize_one(
    table: &IndexTable,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IndexSeries, StoreError> {
    let in_range = lookup(table, name)?.within(start, end);
    let base = in_range
        .first()
        .ok_or_else(|| StoreError::InsufficientData {
            index: name.to_string(),
            required: 1,
            found: 0,
        })?
        .value;

    if base == 0.0 {
        return Err(StoreError::InvalidOperation {
            index: name.to_string(),
            reason: "first value in range is zero; cannot rebase".into(),
        });
    }

    Ok(in_range.map_values(|v| v / base * 100.0)?)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn lookup<'t>(table: &'t IndexTable, name: &str) -> Result<&'t IndexSeries, StoreError> {
    table
        .get(name)
        .ok_or_else(|| StoreError::UnknownIndex(name.to_string()))
}

/// Selection with repeats removed, first occurrence kept.
fn unique<'a>(names: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names.iter().copied().filter(|n| seen.insert(*n)).collect()
}

fn value_at(points: &[Observation], date: NaiveDate) -> Option<f64> {
    points
        .binary_search_by_key(&date, |o| o.date)
        .ok()
        .map(|i| points[i].value)
}

/// Dates present in every slice, ascending.
fn common_dates(slices: &[&[Observation]]) -> Vec<NaiveDate> {
    let Some((first, rest)) = slices.split_first() else {
        return Vec::new();
    };
    first
        .iter()
        .map(|o| o.date)
        .filter(|date| rest.iter().all(|points| value_at(points, *date).is_some()))
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean.is_finite() {
        mean
    } else {
        values.iter().map(|v| v / n).sum()
    }
}
