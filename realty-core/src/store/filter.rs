//! Column listing and date-range slicing.

use super::error::StoreError;
use crate::domain::IndexTable;
use chrono::NaiveDate;

/// All index names in the table, in insertion order.
pub fn available_indices(table: &IndexTable) -> Vec<String> {
    table.names().into_iter().map(str::to_string).collect()
}

/// Reject ranges whose start lies after their end.
pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), StoreError> {
    if start > end {
        return Err(StoreError::InvalidRange { start, end });
    }
    Ok(())
}

/// Sub-table with only observations dated in `[start, end]`.
///
/// Every column survives; a series with nothing in range becomes empty.
pub fn filter_by_date_range(
    table: &IndexTable,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IndexTable, StoreError> {
    check_range(start, end)?;
    Ok(table.map_series(|s| s.within(start, end)))
}
