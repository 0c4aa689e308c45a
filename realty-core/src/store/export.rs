//! CSV export of an index table.
//!
//! Layout: header `date,<index names...>`, one row per date on the common
//! axis in ascending order, dates as `YYYY-MM-DD`, empty cell where an index
//! has no reading.

use super::error::StoreError;
use crate::domain::IndexTable;
use std::io;
use std::path::Path;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Write `table` as CSV to any writer.
pub fn write_csv<W: io::Write>(table: &IndexTable, writer: W) -> Result<(), StoreError> {
    let map_err = |e: csv::Error| StoreError::Export(e.to_string());
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["date"];
    header.extend(table.names());
    out.write_record(&header).map_err(map_err)?;

    for (date, cells) in table.rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        record.extend(
            cells
                .into_iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        );
        out.write_record(&record).map_err(map_err)?;
    }

    out.flush()
        .map_err(|e| StoreError::Export(format!("flush: {e}")))
}

/// Render `table` as a CSV string.
pub fn to_csv_string(table: &IndexTable) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| StoreError::Export(format!("utf-8: {e}")))
}

/// Write `table` as CSV to `path`, replacing any existing file.
pub fn write_csv_file(table: &IndexTable, path: &Path) -> Result<(), StoreError> {
    let file = std::fs::File::create(path)
        .map_err(|e| StoreError::Export(format!("create {}: {e}", path.display())))?;
    write_csv(table, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IndexSeries, Observation};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn table() -> IndexTable {
        IndexTable::new(vec![
            IndexSeries::new(
                "rent",
                vec![
                    Observation::new(d("2024-01-31"), 100.5),
                    Observation::new(d("2024-02-29"), 101.0),
                ],
            )
            .unwrap(),
            IndexSeries::new("reit", vec![Observation::new(d("2024-02-29"), 2000.25)]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn csv_layout() {
        let csv = to_csv_string(&table()).unwrap();
        assert_eq!(
            csv,
            "date,rent,reit\n2024-01-31,100.5,\n2024-02-29,101,2000.25\n"
        );
    }

    #[test]
    fn empty_table_has_header_only() {
        assert_eq!(to_csv_string(&IndexTable::empty()).unwrap(), "date\n");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indices.csv");
        write_csv_file(&table(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,rent,reit\n"));
        assert_eq!(content.lines().count(), 3);
    }
}
