//! Fetch orchestrator: resolves each registry entry's strategy, pulls the
//! body through the transport, parses it, and assembles an `IndexTable`.

use super::error::FetchError;
use super::progress::{FetchProgress, LogProgress};
use super::registry::{SourceDescriptor, SourceRegistry};
use super::strategy::Strategy;
use super::transport::{Request, Transport};
use crate::domain::{IndexSeries, IndexTable};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Courtesy delay between successive requests in a batch.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Lifecycle of the latest fetch of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Pending,
    Fetching,
    Succeeded,
    Failed,
}

#[derive(Debug, Default)]
struct Ledger {
    states: HashMap<String, FetchState>,
    last_success: HashMap<String, DateTime<Utc>>,
}

/// Result of a batch fetch.
#[derive(Debug)]
pub struct FetchSummary {
    /// Successfully fetched series, in request order.
    pub table: IndexTable,
    pub errors: Vec<(String, FetchError)>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl FetchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn error_for(&self, name: &str) -> Option<&FetchError> {
        self.errors.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

pub struct IndexFetcher {
    registry: SourceRegistry,
    transport: Box<dyn Transport>,
    pacing: Duration,
    ledger: Mutex<Ledger>,
}

impl IndexFetcher {
    pub fn new(registry: SourceRegistry, transport: impl Transport + 'static) -> Self {
        Self::with_boxed_transport(registry, Box::new(transport))
    }

    pub fn with_boxed_transport(registry: SourceRegistry, transport: Box<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            pacing: DEFAULT_PACING,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Set the delay slept between requests in a batch. Zero disables it.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Configured sources, in registry order.
    pub fn list_sources(&self) -> &[SourceDescriptor] {
        self.registry.sources()
    }

    /// Fetch one source and normalize it into an `IndexSeries`.
    ///
    /// Safe to call repeatedly; each call performs a fresh fetch. Failures
    /// come back as `FetchError` and leave the source in `Failed`.
    pub fn fetch_one(&self, name: &str) -> Result<IndexSeries, FetchError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| FetchError::UnknownSource(name.to_string()))?;

        self.set_state(name, FetchState::Fetching);
        let result = self.run(descriptor);

        match &result {
            Ok(series) => {
                let mut ledger = self.ledger();
                ledger.states.insert(name.to_string(), FetchState::Succeeded);
                ledger.last_success.insert(name.to_string(), Utc::now());
                debug!(source = name, points = series.len(), "source fetched");
            }
            Err(e) => {
                self.set_state(name, FetchState::Failed);
                warn!(source = name, error = %e, "source fetch failed");
            }
        }
        result
    }

    fn run(&self, descriptor: &SourceDescriptor) -> Result<IndexSeries, FetchError> {
        let strategy = Strategy::resolve(descriptor)?;
        let selector = match &strategy {
            Strategy::Scrape { selector } => Some(selector.as_str()),
            Strategy::Download { .. } | Strategy::Poll { .. } => None,
        };
        let request = Request {
            index: &descriptor.name,
            kind: strategy.kind(),
            endpoint: &descriptor.endpoint,
            query: strategy.query(),
            selector,
        };

        let body = self.transport.fetch(&request)?;
        let points = strategy.parse_body(&body)?;
        IndexSeries::canonicalize(descriptor.name.as_str(), points)
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Fetch every registered source, logging progress.
    pub fn fetch_all(&self) -> FetchSummary {
        self.fetch_all_with_progress(&LogProgress)
    }

    pub fn fetch_all_with_progress(&self, progress: &dyn FetchProgress) -> FetchSummary {
        let names = self.registry.names();
        self.fetch_selected(&names, progress)
    }

    /// Fetch the named sources in order (repeated names once). A failed
    /// source never stops the batch; the pacing delay is slept before every
    /// request but the first.
    pub fn fetch_selected(&self, names: &[&str], progress: &dyn FetchProgress) -> FetchSummary {
        let mut seen = HashSet::new();
        let names: Vec<&str> = names.iter().copied().filter(|n| seen.insert(*n)).collect();
        let total = names.len();
        let mut series = Vec::with_capacity(total);
        let mut errors: Vec<(String, FetchError)> = Vec::new();

        info!(
            sources = total,
            transport = self.transport.name(),
            pacing_ms = self.pacing.as_millis() as u64,
            "starting fetch batch"
        );

        for (i, name) in names.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                std::thread::sleep(self.pacing);
            }

            progress.on_start(name, i, total);
            let result = self.fetch_one(name);
            let outcome = match &result {
                Ok(s) => Ok(s.len()),
                Err(e) => Err(e.clone()),
            };
            progress.on_complete(name, i, total, &outcome);

            match result {
                Ok(s) => series.push(s),
                Err(e) => errors.push((name.to_string(), e)),
            }
        }

        let failed = errors.len();
        let succeeded = total - failed;
        progress.on_batch_complete(succeeded, failed, total);

        FetchSummary {
            table: IndexTable::from_unique_series(series),
            errors,
            total,
            succeeded,
            failed,
        }
    }

    /// State of the latest fetch; `None` for names not in the registry.
    pub fn state(&self, name: &str) -> Option<FetchState> {
        self.registry.get(name)?;
        Some(
            self.ledger()
                .states
                .get(name)
                .copied()
                .unwrap_or(FetchState::Pending),
        )
    }

    /// Time of the latest successful fetch of `name`, or of any source when
    /// `name` is `None`.
    pub fn last_updated(&self, name: Option<&str>) -> Option<DateTime<Utc>> {
        let ledger = self.ledger();
        match name {
            Some(name) => ledger.last_success.get(name).copied(),
            None => ledger.last_success.values().max().copied(),
        }
    }

    fn set_state(&self, name: &str, state: FetchState) {
        self.ledger().states.insert(name.to_string(), state);
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::progress::NoProgress;
    use crate::fetch::synthetic::SyntheticTransport;
    use std::sync::Arc;
    use std::time::Instant;

    /// Synthetic bodies, except for names listed as failing. Records when
    /// each request arrived.
    struct ScriptedTransport {
        inner: SyntheticTransport,
        failing: HashSet<String>,
        calls: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedTransport {
        fn failing(names: &[&str]) -> Self {
            Self {
                inner: SyntheticTransport::default(),
                failing: names.iter().map(|n| n.to_string()).collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(&self, request: &Request<'_>) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(Instant::now());
            if self.failing.contains(request.index) {
                return Err(FetchError::Transport("connection refused".into()));
            }
            self.inner.fetch(request)
        }
    }

    fn registry(names: &[&str]) -> SourceRegistry {
        SourceRegistry::new(
            names
                .iter()
                .map(|n| SourceDescriptor::new(*n, "download", format!("https://example.com/{n}.csv")))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn builtin_sources_fetch_through_synthetic_transport() {
        let fetcher = IndexFetcher::new(SourceRegistry::builtin(), SyntheticTransport::default())
            .with_pacing(Duration::ZERO);
        let summary = fetcher.fetch_all_with_progress(&NoProgress);

        assert!(summary.all_succeeded());
        assert_eq!(summary.table.names(), fetcher.registry().names());
        assert_eq!(summary.table.get("Tokyo Office Rent Index").unwrap().len(), 72);
        assert_eq!(summary.table.get("National Housing Price Index").unwrap().len(), 24);
        assert_eq!(summary.table.get("J-REIT Index").unwrap().len(), 1565);
    }

    #[test]
    fn one_failure_does_not_abort_batch() {
        let fetcher = IndexFetcher::new(registry(&["good", "bad"]), ScriptedTransport::failing(&["bad"]))
            .with_pacing(Duration::ZERO);
        let summary = fetcher.fetch_all_with_progress(&NoProgress);

        assert_eq!(summary.table.names(), vec!["good"]);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].0, "bad");
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(fetcher.state("good"), Some(FetchState::Succeeded));
        assert_eq!(fetcher.state("bad"), Some(FetchState::Failed));
    }

    #[test]
    fn fetch_all_covers_every_registered_source() {
        let transport = ScriptedTransport::failing(&["c"]);
        let calls = Arc::clone(&transport.calls);
        let fetcher = IndexFetcher::new(registry(&["a", "b", "c"]), transport)
            .with_pacing(Duration::ZERO);

        let summary = fetcher.fetch_all();

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.table.names(), vec!["a", "b"]);
        assert!(matches!(summary.error_for("c"), Some(FetchError::Transport(_))));
        assert!(fetcher.last_updated(Some("a")).is_some());
        assert!(fetcher.last_updated(Some("c")).is_none());
    }

    #[test]
    fn unsupported_strategy_leaves_no_series() {
        let registry = SourceRegistry::new(vec![SourceDescriptor::new(
            "rent",
            "carrier-pigeon",
            "https://example.com",
        )])
        .unwrap();
        let fetcher = IndexFetcher::new(registry, SyntheticTransport::default())
            .with_pacing(Duration::ZERO);

        let err = fetcher.fetch_one("rent").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedStrategy { .. }));
        assert_eq!(fetcher.state("rent"), Some(FetchState::Failed));
        assert_eq!(fetcher.last_updated(Some("rent")), None);

        let summary = fetcher.fetch_all_with_progress(&NoProgress);
        assert!(summary.table.is_empty());
    }

    #[test]
    fn unknown_source() {
        let fetcher = IndexFetcher::new(registry(&["a"]), SyntheticTransport::default());
        assert_eq!(
            fetcher.fetch_one("zzz").unwrap_err(),
            FetchError::UnknownSource("zzz".into())
        );
        assert_eq!(fetcher.state("zzz"), None);
    }

    #[test]
    fn last_updated_tracks_successes() {
        let fetcher = IndexFetcher::new(registry(&["a", "b"]), ScriptedTransport::failing(&["b"]))
            .with_pacing(Duration::ZERO);
        assert_eq!(fetcher.last_updated(None), None);
        assert_eq!(fetcher.state("a"), Some(FetchState::Pending));

        let before = Utc::now();
        fetcher.fetch_one("a").unwrap();
        let _ = fetcher.fetch_one("b");

        let a = fetcher.last_updated(Some("a")).unwrap();
        assert!(a >= before);
        assert_eq!(fetcher.last_updated(Some("b")), None);
        assert_eq!(fetcher.last_updated(None), Some(a));
    }

    #[test]
    fn fetch_one_is_repeatable() {
        let fetcher = IndexFetcher::new(registry(&["a"]), SyntheticTransport::default());
        let first = fetcher.fetch_one("a").unwrap();
        let second = fetcher.fetch_one("a").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pacing_only_between_requests() {
        let pacing = Duration::from_millis(120);
        let transport = ScriptedTransport::failing(&[]);
        let calls = Arc::clone(&transport.calls);
        let fetcher = IndexFetcher::new(registry(&["a", "b", "c"]), transport).with_pacing(pacing);

        fetcher.fetch_all_with_progress(&NoProgress);
        let finished = Instant::now();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= pacing);
        }
        // No trailing sleep after the last request
        assert!(finished - calls[2] < pacing);
    }

    #[test]
    fn selected_names_are_deduplicated() {
        let transport = ScriptedTransport::failing(&[]);
        let calls = Arc::clone(&transport.calls);
        let fetcher = IndexFetcher::new(registry(&["a", "b"]), transport).with_pacing(Duration::ZERO);

        let summary = fetcher.fetch_selected(&["b", "a", "b", "missing"], &NoProgress);
        assert_eq!(summary.table.names(), vec!["b", "a"]);
        assert_eq!(summary.total, 3);
        assert!(matches!(
            summary.error_for("missing"),
            Some(FetchError::UnknownSource(_))
        ));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }
}
