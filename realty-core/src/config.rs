//! Application configuration.
//!
//! Everything is optional: an empty file (or no file) gives the sample
//! dataset defaults, the built-in source registry, and the synthetic
//! transport.

use crate::fetch::{
    HttpTransport, IndexFetcher, SourceDescriptor, SourceRegistry, SyntheticTransport, Transport,
    DEFAULT_USER_AGENT,
};
use crate::store::SampleConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid TOML: {0}")]
    Toml(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("duplicate source name '{0}'")]
    DuplicateSource(String),

    #[error("HTTP client: {0}")]
    Http(String),
}

/// Which transport the fetcher uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Offline placeholder bodies.
    #[default]
    Synthetic,
    /// Live requests against each source's endpoint.
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Courtesy delay between requests, in milliseconds.
    pub pacing_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub transport: TransportKind,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            pacing_ms: 1000,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            transport: TransportKind::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchSettings,
    pub sample: SampleConfig,
    /// Empty means the built-in registry.
    pub sources: Vec<SourceDescriptor>,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample.start > self.sample.end {
            return Err(ConfigError::Invalid(format!(
                "sample.start {} is after sample.end {}",
                self.sample.start, self.sample.end
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// The configured registry, or the built-in one when none is given.
    pub fn registry(&self) -> Result<SourceRegistry, ConfigError> {
        if self.sources.is_empty() {
            Ok(SourceRegistry::builtin())
        } else {
            SourceRegistry::new(self.sources.clone())
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.fetch.pacing_ms)
    }

    pub fn build_transport(&self) -> Result<Box<dyn Transport>, ConfigError> {
        Ok(match self.fetch.transport {
            TransportKind::Synthetic => Box::new(SyntheticTransport::default()),
            TransportKind::Http => Box::new(
                HttpTransport::new(
                    Duration::from_secs(self.fetch.timeout_secs),
                    &self.fetch.user_agent,
                )
                .map_err(|e| ConfigError::Http(e.to_string()))?,
            ),
        })
    }

    pub fn build_fetcher(&self) -> Result<IndexFetcher, ConfigError> {
        let fetcher =
            IndexFetcher::with_boxed_transport(self.registry()?, self.build_transport()?);
        Ok(fetcher.with_pacing(self.pacing()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pacing(), Duration::from_secs(1));
        assert_eq!(config.registry().unwrap(), SourceRegistry::builtin());
        assert_eq!(config.build_transport().unwrap().name(), "synthetic");
    }

    #[test]
    fn parses_all_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [fetch]
            pacing_ms = 0
            transport = "http"

            [sample]
            seed = 7
            start = "2020-01-01"
            end = "2020-12-31"

            [[sources]]
            name = "Osaka Office Rent"
            strategy = "download"
            endpoint = "https://example.com/osaka.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.pacing_ms, 0);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.transport, TransportKind::Http);
        assert_eq!(config.sample.seed, 7);
        assert_eq!(config.sample.end, NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
        assert_eq!(config.registry().unwrap().names(), vec!["Osaka Office Rent"]);

        let fetcher = config.build_fetcher().unwrap();
        assert_eq!(fetcher.transport_name(), "http");
        assert_eq!(fetcher.pacing(), Duration::ZERO);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_toml_str("[fetch]\ntransport = \"carrier-pigeon\"\n"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[sample]\nstart = \"2024-01-01\"\nend = \"2023-01-01\"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn duplicate_sources_surface_on_registry() {
        let config = AppConfig::from_toml_str(
            r#"
            [[sources]]
            name = "a"
            strategy = "download"
            endpoint = "https://a"

            [[sources]]
            name = "a"
            strategy = "poll"
            endpoint = "https://b"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.registry().unwrap_err(),
            ConfigError::DuplicateSource("a".into())
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("realty.toml");
        assert!(matches!(AppConfig::load(&missing), Err(ConfigError::Io { .. })));

        std::fs::write(&missing, "[fetch]\npacing_ms = 250\n").unwrap();
        assert_eq!(AppConfig::load(&missing).unwrap().pacing(), Duration::from_millis(250));
    }
}
