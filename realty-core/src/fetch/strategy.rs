//! Acquisition strategies.
//!
//! A descriptor's strategy string is resolved once into the closed
//! `Strategy` enum; everything downstream dispatches with an exhaustive
//! `match`.

use super::error::FetchError;
use super::parse;
use super::registry::SourceDescriptor;
use crate::domain::Observation;
use std::fmt;

/// Strategy tag without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Download,
    Scrape,
    Poll,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Download => "download",
            StrategyKind::Scrape => "scrape",
            StrategyKind::Poll => "poll",
        }
    }

    /// Parse a configured strategy name. Accepts the legacy source-type names
    /// (`csv_url`, `web_scrape`, `api`) as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "download" | "csv_url" | "csv" => Some(StrategyKind::Download),
            "scrape" | "web_scrape" => Some(StrategyKind::Scrape),
            "poll" | "api" => Some(StrategyKind::Poll),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved strategy with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// CSV body; `column` picks the value column (default: first non-date column).
    Download { column: Option<String> },
    /// HTML document; rows are read from the first element matching `selector`.
    Scrape { selector: String },
    /// Structured (JSON) response; `query` is sent as URL query parameters.
    Poll { query: Vec<(String, String)> },
}

impl Strategy {
    /// Resolve a descriptor's strategy string and parameters.
    pub fn resolve(descriptor: &SourceDescriptor) -> Result<Self, FetchError> {
        let kind = StrategyKind::parse(&descriptor.strategy).ok_or_else(|| {
            FetchError::UnsupportedStrategy {
                index: descriptor.name.clone(),
                strategy: descriptor.strategy.clone(),
            }
        })?;

        Ok(match kind {
            StrategyKind::Download => Strategy::Download {
                column: descriptor.param("column").map(str::to_string),
            },
            StrategyKind::Scrape => Strategy::Scrape {
                selector: descriptor
                    .param("selector")
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| FetchError::MissingParameter {
                        index: descriptor.name.clone(),
                        param: "selector".into(),
                    })?
                    .to_string(),
            },
            StrategyKind::Poll => Strategy::Poll {
                query: descriptor
                    .strategy_params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Download { .. } => StrategyKind::Download,
            Strategy::Scrape { .. } => StrategyKind::Scrape,
            Strategy::Poll { .. } => StrategyKind::Poll,
        }
    }

    /// Query parameters to send with the request.
    pub fn query(&self) -> &[(String, String)] {
        match self {
            Strategy::Poll { query } => query,
            Strategy::Download { .. } | Strategy::Scrape { .. } => &[],
        }
    }

    /// Turn a response body into raw observations.
    pub fn parse_body(&self, body: &str) -> Result<Vec<Observation>, FetchError> {
        match self {
            Strategy::Download { column } => parse::parse_csv(body, column.as_deref()),
            Strategy::Scrape { selector } => parse::parse_html_table(body, selector),
            Strategy::Poll { .. } => parse::parse_json(body),
        }
    }
}
