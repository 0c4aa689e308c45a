//! Source registry: the static list of index sources and how to reach them.
//!
//! The registry is an explicit value: built once (from TOML or the built-in
//! defaults), never mutated, and handed to the fetcher by the caller.

use crate::config::ConfigError;
use crate::domain::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// How to acquire one index.
///
/// `strategy` stays a plain string here so configuration can name anything;
/// it is resolved into a `Strategy` when the source is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub strategy: String,
    pub endpoint: String,
    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_frequency: Option<String>,
    /// Strategy-specific options (`selector` for scrape, query parameters
    /// for poll, optional `column` for download).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub strategy_params: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        strategy: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            endpoint: endpoint.into(),
            update_frequency: None,
            strategy_params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strategy_params.insert(key.into(), value.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.update_frequency = Some(frequency.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.strategy_params.get(key).map(String::as_str)
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    sources: Vec<SourceDescriptor>,
}

/// Ordered, immutable set of uniquely named sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Build a registry, rejecting empty or duplicate names.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source name must not be empty".into()));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }
        Ok(Self { sources })
    }

    /// Load a registry from a TOML file with `[[sources]]` entries.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a registry from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))?;
        Self::new(file.sources)
    }

    /// Serialize the registry to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = RegistryFile {
            sources: self.sources.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// The three reference sources: one per strategy.
    pub fn builtin() -> Self {
        Self {
            sources: vec![
                SourceDescriptor::new(
                    "Tokyo Office Rent Index",
                    "download",
                    "https://example.com/tokyo_office_rent_index.csv",
                )
                .with_frequency("monthly"),
                SourceDescriptor::new(
                    "National Housing Price Index",
                    "scrape",
                    "https://example.com/japan_housing_price_index",
                )
                .with_param("selector", "table.price-index")
                .with_frequency("quarterly"),
                SourceDescriptor::new(
                    "J-REIT Index",
                    "poll",
                    "https://api.example.com/jreit_index",
                )
                .with_param("format", "json")
                .with_param("period", "daily")
                .with_frequency("daily"),
            ],
        }
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Deterministic identity of the whole registry, in order.
    pub fn fingerprint(&self) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        for source in &self.sources {
            for field in [&source.name, &source.strategy, &source.endpoint] {
                hasher.update(field.as_bytes());
                hasher.update(&[0x1f]);
            }
            // BTreeMap iterates in key order
            for (key, value) in &source.strategy_params {
                hasher.update(key.as_bytes());
                hasher.update(b"=");
                hasher.update(value.as_bytes());
                hasher.update(&[0x1f]);
            }
            hasher.update(source.update_frequency.as_deref().unwrap_or("").as_bytes());
            hasher.update(&[0x1e]);
        }
        CacheKey(hasher.finalize().to_hex().to_string())
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
