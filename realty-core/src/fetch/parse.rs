//! Body parsers for the three strategies.
//!
//! Each parser returns raw `(date, value)` points in document order; the
//! fetcher canonicalizes them into an `IndexSeries`.

use super::error::FetchError;
use crate::domain::Observation;
use chrono::{DateTime, NaiveDate};
use scraper::{Html, Selector};
use serde::Deserialize;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

/// Parse a date cell. Accepts ISO dates, a few common separators, and
/// RFC 3339 timestamps (date part kept).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Parse a numeric cell, tolerating thousands separators. Blank and `-`
/// cells are treated as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Download strategy: CSV with a header row.
///
/// The date column is the one headed `date` (any case), else the first
/// column. The value column is `column` when given, else the first
/// non-date column. Rows with an empty value are skipped.
pub fn parse_csv(body: &str, column: Option<&str>) -> Result<Vec<Observation>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::Parse(format!("csv header: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .unwrap_or(0);
    let value_idx = match column {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FetchError::Parse(format!("csv column '{name}' not found")))?,
        None => (0..headers.len())
            .find(|i| *i != date_idx)
            .ok_or_else(|| FetchError::Parse("csv has no value column".into()))?,
    };

    let mut points = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record = record.map_err(|e| FetchError::Parse(format!("csv line {line}: {e}")))?;
        let raw_date = record.get(date_idx).unwrap_or("");
        let raw_value = record.get(value_idx).unwrap_or("");
        if raw_date.is_empty() && raw_value.is_empty() {
            continue;
        }

        let date = parse_date(raw_date)
            .ok_or_else(|| FetchError::Parse(format!("csv line {line}: bad date '{raw_date}'")))?;
        match parse_number(raw_value) {
            Some(value) => points.push(Observation::new(date, value)),
            None if raw_value.is_empty() || raw_value == "-" => continue,
            None => {
                return Err(FetchError::Parse(format!(
                    "csv line {line}: bad value '{raw_value}'"
                )))
            }
        }
    }

    non_empty(points, "csv body")
}

/// Scrape strategy: rows of the first element matching `selector`.
///
/// A row counts when its first cell is a date and a later cell is a number;
/// header and decoration rows are skipped.
pub fn parse_html_table(body: &str, selector: &str) -> Result<Vec<Observation>, FetchError> {
    let target = Selector::parse(selector)
        .map_err(|e| FetchError::Parse(format!("invalid selector '{selector}': {e:?}")))?;
    let row_selector = Selector::parse("tr")
        .map_err(|e| FetchError::Parse(format!("row selector: {e:?}")))?;
    let cell_selector = Selector::parse("td, th")
        .map_err(|e| FetchError::Parse(format!("cell selector: {e:?}")))?;

    let document = Html::parse_document(body);
    let region = document
        .select(&target)
        .next()
        .ok_or_else(|| FetchError::Parse(format!("selector '{selector}' matched nothing")))?;

    let mut points = Vec::new();
    for row in region.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        let Some(date) = cells.first().and_then(|c| parse_date(c)) else {
            continue;
        };
        if let Some(value) = cells.iter().skip(1).find_map(|c| parse_number(c)) {
            points.push(Observation::new(date, value));
        }
    }

    non_empty(points, "html table")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PollBody {
    Wrapped { data: Vec<PollPoint> },
    Bare(Vec<PollPoint>),
}

#[derive(Debug, Deserialize)]
struct PollPoint {
    #[serde(alias = "timestamp")]
    date: String,
    #[serde(alias = "close")]
    value: Option<PollValue>,
}

/// Some feeds quote their numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PollValue {
    Number(f64),
    Text(String),
}

impl PollValue {
    /// `Ok(None)` for a blank or `-` string.
    fn resolve(&self) -> Result<Option<f64>, String> {
        match self {
            Self::Number(v) => Ok(Some(*v).filter(|v| v.is_finite())),
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed == "-" {
                    return Ok(None);
                }
                parse_number(trimmed).map(Some).ok_or_else(|| raw.clone())
            }
        }
    }
}

/// Poll strategy: JSON, either `{"data": [...]}` or a bare array of
/// `{"date": ..., "value": ...}` points. Values may be numbers or numeric
/// strings; null and blank values are skipped.
pub fn parse_json(body: &str) -> Result<Vec<Observation>, FetchError> {
    let parsed: PollBody =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("json body: {e}")))?;
    let raw = match parsed {
        PollBody::Wrapped { data } => data,
        PollBody::Bare(points) => points,
    };

    let mut points = Vec::with_capacity(raw.len());
    for point in raw {
        let date = parse_date(&point.date)
            .ok_or_else(|| FetchError::Parse(format!("json: bad date '{}'", point.date)))?;
        let value = match &point.value {
            Some(v) => v
                .resolve()
                .map_err(|raw| FetchError::Parse(format!("json: bad value '{raw}' on {date}")))?,
            None => None,
        };
        if let Some(value) = value {
            points.push(Observation::new(date, value));
        }
    }

    non_empty(points, "json body")
}

fn non_empty(points: Vec<Observation>, what: &str) -> Result<Vec<Observation>, FetchError> {
    if points.is_empty() {
        return Err(FetchError::Parse(format!("{what} contained no observations")));
    }
    Ok(points)
}
