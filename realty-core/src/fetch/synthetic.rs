//! Offline transport producing well-formed placeholder bodies.
//!
//! Values are a plain ramp (`100, 101, 102, ...`) on a per-strategy date
//! grid: month ends for download, quarter ends for scrape, weekdays for
//! poll. Bodies are real CSV / HTML / JSON so they exercise the same
//! parsers a live source would.

use super::error::FetchError;
use super::strategy::StrategyKind;
use super::transport::{Request, Transport};
use crate::calendar::{month_ends, quarter_ends, weekdays, DEFAULT_END, DEFAULT_START};
use chrono::NaiveDate;
use std::fmt::Write as _;

const RAMP_START: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct SyntheticTransport {
    start: NaiveDate,
    end: NaiveDate,
}

impl SyntheticTransport {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    fn dates_for(&self, kind: StrategyKind) -> Vec<NaiveDate> {
        match kind {
            StrategyKind::Download => month_ends(self.start, self.end),
            StrategyKind::Scrape => quarter_ends(self.start, self.end),
            StrategyKind::Poll => weekdays(self.start, self.end),
        }
    }
}

impl Default for SyntheticTransport {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

impl Transport for SyntheticTransport {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &Request<'_>) -> Result<String, FetchError> {
        let points: Vec<(NaiveDate, f64)> = self
            .dates_for(request.kind)
            .into_iter()
            .enumerate()
            .map(|(i, date)| (date, RAMP_START + i as f64))
            .collect();

        Ok(match request.kind {
            StrategyKind::Download => csv_body(&points),
            StrategyKind::Scrape => html_body(request.index, request.selector, &points),
            StrategyKind::Poll => json_body(request.index, &points),
        })
    }
}

fn csv_body(points: &[(NaiveDate, f64)]) -> String {
    let mut body = String::from("date,value\n");
    for (date, value) in points {
        let _ = writeln!(body, "{date},{value}");
    }
    body
}

fn json_body(index: &str, points: &[(NaiveDate, f64)]) -> String {
    let data: Vec<_> = points
        .iter()
        .map(|(date, value)| serde_json::json!({ "date": date.to_string(), "value": value }))
        .collect();
    serde_json::json!({ "index": index, "data": data }).to_string()
}

fn html_body(index: &str, selector: Option<&str>, points: &[(NaiveDate, f64)]) -> String {
    let (open, close) = wrapper_for(selector.unwrap_or("table"));
    let mut body = String::from("<html><body>");
    body.push_str(&open);
    let _ = write!(body, "<tr><th>Date</th><th>{}</th></tr>", escape(index));
    for (date, value) in points {
        let _ = write!(body, "<tr><td>{date}</td><td>{value}</td></tr>");
    }
    body.push_str(&close);
    body.push_str("</body></html>");
    body
}

/// One compound selector (`div#main.wide`), reduced to what markup needs.
#[derive(Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// Parse `tag`, `#id` and `.class` parts; attribute and pseudo-class
/// suffixes are ignored.
fn parse_compound(raw: &str) -> Compound {
    let mut compound = Compound::default();
    let mut mode = 't';
    let mut current = String::new();

    for ch in raw.chars() {
        match ch {
            '.' | '#' => {
                flush_part(mode, &mut current, &mut compound);
                mode = ch;
            }
            '[' | ':' => break,
            _ => current.push(ch),
        }
    }
    flush_part(mode, &mut current, &mut compound);
    compound
}

fn flush_part(mode: char, current: &mut String, compound: &mut Compound) {
    if current.is_empty() {
        return;
    }
    let part = std::mem::take(current);
    match mode {
        '#' => compound.id = Some(part),
        '.' => compound.classes.push(part),
        _ => compound.tag = Some(part.to_ascii_lowercase()),
    }
}

/// Opening and closing markup whose innermost element is a `<table>`
/// matched by `selector`. Only the first selector of a group is used.
fn wrapper_for(selector: &str) -> (String, String) {
    let first = selector.split(',').next().unwrap_or("");
    let compounds: Vec<Compound> = first
        .split_whitespace()
        .filter(|part| !matches!(*part, ">" | "+" | "~"))
        .map(parse_compound)
        .filter(|c| !matches!(c.tag.as_deref(), Some("html" | "body")))
        .collect();

    let mut open = String::new();
    let mut close = String::new();
    let last = compounds.len().saturating_sub(1);

    for (i, compound) in compounds.iter().enumerate() {
        let default_tag = if i == last { "table" } else { "div" };
        let tag = compound.tag.as_deref().unwrap_or(default_tag);
        open.push('<');
        open.push_str(tag);
        if let Some(id) = &compound.id {
            let _ = write!(open, " id=\"{}\"", escape(id));
        }
        if !compound.classes.is_empty() {
            let _ = write!(open, " class=\"{}\"", escape(&compound.classes.join(" ")));
        }
        open.push('>');
        close.insert_str(0, &format!("</{tag}>"));
    }

    let innermost_is_table = compounds
        .last()
        .map(|c| matches!(c.tag.as_deref(), None | Some("table")))
        .unwrap_or(false);
    if !innermost_is_table {
        open.push_str("<table>");
        close.insert_str(0, "</table>");
    }
    (open, close)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::parse;

    fn request<'a>(kind: StrategyKind, selector: Option<&'a str>) -> Request<'a> {
        Request {
            index: "Test Index",
            kind,
            endpoint: "https://example.com",
            query: &[],
            selector,
        }
    }

    #[test]
    fn download_body_parses_as_monthly_ramp() {
        let body = SyntheticTransport::default()
            .fetch(&request(StrategyKind::Download, None))
            .unwrap();
        let points = parse::parse_csv(&body, None).unwrap();
        assert_eq!(points.len(), 72);
        assert_eq!(points[0].value, 100.0);
        assert_eq!(points[71].value, 171.0);
    }

    #[test]
    fn scrape_body_matches_selector() {
        let transport = SyntheticTransport::default();
        for selector in ["table.price-index", "div#content table", "section.stats > .grid"] {
            let body = transport
                .fetch(&request(StrategyKind::Scrape, Some(selector)))
                .unwrap();
            let points = parse::parse_html_table(&body, selector)
                .unwrap_or_else(|e| panic!("{selector}: {e}"));
            assert_eq!(points.len(), 24, "{selector}");
        }
    }

    #[test]
    fn poll_body_has_weekdays_only() {
        let body = SyntheticTransport::default()
            .fetch(&request(StrategyKind::Poll, None))
            .unwrap();
        let points = parse::parse_json(&body).unwrap();
        // 2018-01-01..=2023-12-31 is exactly 313 weeks
        assert_eq!(points.len(), 313 * 5);
        assert!(points.iter().all(|o| crate::calendar::is_business_day(o.date)));
    }

    #[test]
    fn compound_parsing() {
        assert_eq!(
            parse_compound("div#main.wide.dark"),
            Compound {
                tag: Some("div".into()),
                id: Some("main".into()),
                classes: vec!["wide".into(), "dark".into()],
            }
        );
        assert_eq!(parse_compound(".x[data-k=v]").classes, vec!["x".to_string()]);
    }

    #[test]
    fn wrapper_nests_table_innermost() {
        let (open, close) = wrapper_for("section.stats > .grid");
        assert_eq!(open, "<section class=\"stats\"><table class=\"grid\">");
        assert_eq!(close, "</table></section>");

        let (open, close) = wrapper_for("div#content");
        assert_eq!(open, "<div id=\"content\"><table>");
        assert_eq!(close, "</table></div>");
    }
}
