//! Concurrent sweep over every (server, domain) pair.
//!
//! The [`Scheduler`] fans probes out to a bounded pool of tokio tasks,
//! records each outcome in a [`ResultStore`], advances a
//! [`ProgressTracker`], and waits for the pool to drain before handing the
//! store to the summarizer. The [`Engine`] wraps it with the one-run-at-a-time
//! rule consumers rely on.

#![allow(clippy::missing_errors_doc)]

use crate::dns::probe::{probe, Resolve};
use crate::dns::progress::ProgressTracker;
use crate::dns::store::ResultStore;
use crate::dns::summary::{summarize, OutcomeCounts, RunReport};
use crate::dns::types::{Domain, ProbeOutcome, ProgressSnapshot, Server};
use crate::error::{Error, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::AbortHandle;

/// Default per-probe timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Default number of concurrent probes.
pub const DEFAULT_WORKERS: usize = 10;

/// Domain used when no domain list is configured.
pub const DEFAULT_DOMAIN: &str = "example.com";

/// Which domains a run probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every server against one domain
    Single(Domain),
    /// Every server against every catalog domain
    Multi,
}

/// Immutable parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Servers in load order
    pub servers: Vec<Server>,
    /// Every known domain, in load order
    pub catalog: Vec<Domain>,
    /// Domain selection
    pub mode: RunMode,
    /// Per-probe timeout
    pub timeout: Duration,
    /// Maximum number of probes in flight
    pub workers: usize,
}

impl RunConfig {
    /// Probe every server against a single domain.
    #[must_use]
    pub fn single(servers: Vec<Server>, domain: Domain) -> Self {
        Self {
            servers,
            catalog: vec![domain.clone()],
            mode: RunMode::Single(domain),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Probe every server against every domain.
    #[must_use]
    pub fn multi(servers: Vec<Server>, domains: Vec<Domain>) -> Self {
        Self {
            servers,
            catalog: domains,
            mode: RunMode::Multi,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Replace the domain catalog used for "untested" reporting.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<Domain>) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Domains probed by this run.
    #[must_use]
    pub fn selection(&self) -> Vec<Domain> {
        match &self.mode {
            RunMode::Single(domain) => vec![domain.clone()],
            RunMode::Multi => self.catalog.clone(),
        }
    }

    /// Domains reported in the summary: the catalog, then any selected
    /// domain missing from it.
    #[must_use]
    pub fn domains_considered(&self) -> Vec<Domain> {
        let mut domains = self.catalog.clone();
        for domain in self.selection() {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        domains
    }

    /// Probe tasks in submission order: server-major, domain-minor.
    #[must_use]
    pub fn tasks(&self) -> Vec<(Server, Domain)> {
        let selection = self.selection();
        self.servers
            .iter()
            .flat_map(|server| {
                selection
                    .iter()
                    .map(move |domain| (server.clone(), domain.clone()))
            })
            .collect()
    }

    /// Number of probes in the run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.servers.len() * self.selection().len()
    }

    /// Describe why the run has nothing to dispatch, if so.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.servers.is_empty() {
            Some("no DNS servers configured".to_string())
        } else if self.selection().is_empty() {
            Some("no domains selected".to_string())
        } else {
            None
        }
    }
}

/// Notifications delivered to observers while a run progresses.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Dispatch is about to begin.
    Started { total: usize },
    /// A single probe settled.
    Outcome(ProbeOutcome),
    /// The completed counter moved.
    Progress(ProgressSnapshot),
    /// The run could not dispatch anything.
    ConfigError(String),
    /// The pool drained and the report is final.
    Completed(RunReport),
}

/// Sending half of the observer channel.
pub type EventSender = mpsc::UnboundedSender<RunEvent>;

/// Receiving half of the observer channel.
pub type EventReceiver = mpsc::UnboundedReceiver<RunEvent>;

fn emit(events: Option<&EventSender>, event: RunEvent) {
    if let Some(tx) = events {
        // A dropped observer is not an error for the run
        let _ = tx.send(event);
    }
}

/// Fan-out/drain driver for one run at a time.
pub struct Scheduler<R: ?Sized> {
    resolver: Arc<R>,
    events: Option<EventSender>,
}

impl<R: ?Sized> Clone for Scheduler<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            events: self.events.clone(),
        }
    }
}

impl<R> Scheduler<R>
where
    R: Resolve + ?Sized + 'static,
{
    /// Create a scheduler over a shared resolver.
    #[must_use]
    pub fn new(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            events: None,
        }
    }

    /// Attach an observer channel.
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Probe every task of `config` and return the final report.
    ///
    /// Returns only after every spawned probe has settled. An empty server
    /// or domain selection is reported once as [`RunEvent::ConfigError`]
    /// and completes as an empty run. Dropping the returned future cancels
    /// the run: probes still in flight are aborted and emit nothing more.
    pub async fn run(&self, config: &RunConfig) -> RunReport {
        self.run_guarded(config, None).await
    }

    async fn run_guarded(&self, config: &RunConfig, active: Option<ActiveRun>) -> RunReport {
        let started_at = Utc::now();
        let considered = config.domains_considered();

        if let Some(problem) = config.validate() {
            tracing::warn!("run skipped: {problem}");
            emit(self.events.as_ref(), RunEvent::ConfigError(problem));
            let report = RunReport::empty(started_at, &considered);
            drop(active);
            emit(self.events.as_ref(), RunEvent::Completed(report.clone()));
            return report;
        }

        let tasks = config.tasks();
        let total = tasks.len();
        let workers = config.workers.max(1);
        tracing::info!(
            servers = config.servers.len(),
            domains = total / config.servers.len(),
            workers,
            timeout_ms = config.timeout.as_millis() as u64,
            "starting run of {total} probes"
        );
        emit(self.events.as_ref(), RunEvent::Started { total });

        let store = Arc::new(ResultStore::new(&config.servers));
        let progress = Arc::new(ProgressTracker::new(total));
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut probes = ProbeSet::new(active);
        let mut handles = Vec::with_capacity(total);
        let start = Instant::now();

        for (server, domain) in tasks {
            let resolver = Arc::clone(&self.resolver);
            let store = Arc::clone(&store);
            let progress = Arc::clone(&progress);
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&probes.cancelled);
            let events = self.events.clone();
            let limit = config.timeout;

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        tracing::warn!("worker pool closed, probing unbounded: {e}");
                        None
                    }
                };

                let outcome = probe(resolver.as_ref(), &server, &domain, limit).await;

                let cancelled = cancelled.lock().unwrap_or_else(PoisonError::into_inner);
                if *cancelled {
                    return;
                }
                store.record(&outcome);
                let snapshot = progress.advance();
                emit(events.as_ref(), RunEvent::Outcome(outcome));
                emit(events.as_ref(), RunEvent::Progress(snapshot));
            });
            probes.aborts.push(handle.abort_handle());
            handles.push(handle);
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("probe task failed: {e}");
            }
        }
        // Every probe has settled; release the engine before announcing completion
        drop(probes);

        let elapsed = start.elapsed();
        let (servers, domains) = summarize(&store, &considered);
        let report = RunReport {
            started_at,
            elapsed,
            progress: progress.snapshot(),
            counts: OutcomeCounts::tally(&store.samples()),
            servers,
            domains,
        };

        tracing::info!(
            completed = report.progress.completed,
            failed = report.counts.failed(),
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
        emit(self.events.as_ref(), RunEvent::Completed(report.clone()));
        report
    }
}

/// Clears the active flag when a run ends, including when its future is
/// dropped.
struct ActiveRun(Arc<AtomicBool>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Probe tasks of one run.
///
/// On drop the gate is closed under its lock, so no task records or emits
/// afterwards, and the remaining tasks are aborted. The active flag is
/// released last.
struct ProbeSet {
    aborts: Vec<AbortHandle>,
    cancelled: Arc<Mutex<bool>>,
    _active: Option<ActiveRun>,
}

impl ProbeSet {
    fn new(active: Option<ActiveRun>) -> Self {
        Self {
            aborts: Vec::new(),
            cancelled: Arc::new(Mutex::new(false)),
            _active: active,
        }
    }
}

impl Drop for ProbeSet {
    fn drop(&mut self) {
        *self
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
        for task in &self.aborts {
            task.abort();
        }
    }
}

/// Entry point for consumers: one run at a time per engine.
///
/// Clones share the active flag, so a clone handed to a background task
/// still rejects overlapping runs.
pub struct Engine<R: ?Sized> {
    scheduler: Scheduler<R>,
    active: Arc<AtomicBool>,
}

impl<R: ?Sized> Clone for Engine<R> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            active: Arc::clone(&self.active),
        }
    }
}

impl<R> Engine<R>
where
    R: Resolve + 'static,
{
    /// Create an engine that owns `resolver`.
    #[must_use]
    pub fn new(resolver: R) -> Self {
        Self::from_shared(Arc::new(resolver))
    }
}

impl<R> Engine<R>
where
    R: Resolve + ?Sized + 'static,
{
    /// Create an engine over a shared resolver.
    #[must_use]
    pub fn from_shared(resolver: Arc<R>) -> Self {
        Self {
            scheduler: Scheduler::new(resolver),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach an observer channel.
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.scheduler = self.scheduler.with_events(events);
        self
    }

    /// Check if a run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a run and wait for its report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunInProgress`] if this engine is already running.
    pub async fn start_run(&self, config: RunConfig) -> Result<RunReport> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("run rejected, another run is active");
            return Err(Error::RunInProgress);
        }
        let active = ActiveRun(Arc::clone(&self.active));

        Ok(self.scheduler.run_guarded(&config, Some(active)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::probe::LookupError;
    use crate::dns::types::{Latency, OutcomeKind, SeverityBand};
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeResolver {
        delays: HashMap<String, Duration>,
        failures: HashMap<String, LookupError>,
    }

    impl FakeResolver {
        fn answer(mut self, server: &str, ms: u64) -> Self {
            self.delays
                .insert(server.to_string(), Duration::from_millis(ms));
            self
        }

        fn fail(mut self, server: &str, error: LookupError) -> Self {
            self.failures.insert(server.to_string(), error);
            self
        }
    }

    #[async_trait]
    impl Resolve for FakeResolver {
        async fn lookup_a(
            &self,
            server: &Server,
            _domain: &Domain,
            _timeout: Duration,
        ) -> std::result::Result<(), LookupError> {
            if let Some(error) = self.failures.get(server.as_str()) {
                return Err(error.clone());
            }
            let delay = self
                .delays
                .get(server.as_str())
                .copied()
                .unwrap_or(Duration::from_millis(1));
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }

    fn servers(names: &[&str]) -> Vec<Server> {
        names.iter().map(|s| Server::new(*s)).collect()
    }

    #[test]
    fn test_tasks_are_server_major() {
        let config = RunConfig::multi(
            servers(&["a", "b"]),
            vec!["x.com".into(), "y.com".into()],
        );
        let tasks: Vec<_> = config
            .tasks()
            .into_iter()
            .map(|(s, d)| format!("{s}/{d}"))
            .collect();
        assert_eq!(tasks, vec!["a/x.com", "a/y.com", "b/x.com", "b/y.com"]);
        assert_eq!(config.total(), 4);
    }

    #[test]
    fn test_single_mode_considers_catalog() {
        let config = RunConfig::single(servers(&["a"]), "z.com".into())
            .with_catalog(vec!["x.com".into(), "y.com".into()]);
        assert_eq!(config.total(), 1);
        assert_eq!(
            config.domains_considered(),
            vec![Domain::new("x.com"), "y.com".into(), "z.com".into()]
        );
    }

    #[tokio::test]
    async fn test_run_ranks_and_counts() {
        let resolver = FakeResolver::default()
            .answer("slow", 120)
            .answer("fast", 5)
            .fail("dead", LookupError::NoNameservers);
        let scheduler = Scheduler::new(Arc::new(resolver));
        let config = RunConfig::single(servers(&["slow", "dead", "fast"]), "example.com".into());

        let report = scheduler.run(&config).await;

        let order: Vec<_> = report.servers.iter().map(|r| r.server.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow", "dead"]);
        assert_eq!(report.servers[2].latency, Latency::Timeout);
        assert_eq!(report.servers[2].band, SeverityBand::Bad);
        assert_eq!(report.servers[2].outcomes, vec!["No nameservers"]);
        assert_eq!(report.progress, ProgressSnapshot { completed: 3, total: 3 });
        assert_eq!(report.counts.no_nameservers, 1);
        assert_eq!(report.best().unwrap().server.as_str(), "fast");
    }

    #[tokio::test]
    async fn test_small_pool_records_every_pair() {
        let names: Vec<String> = (0..12).map(|i| format!("10.0.0.{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let domains: Vec<Domain> = (0..5).map(|i| Domain::new(format!("d{i}.com"))).collect();
        let config = RunConfig::multi(servers(&names), domains).with_workers(3);

        let scheduler = Scheduler::new(Arc::new(FakeResolver::default()));
        let report = scheduler.run(&config).await;

        assert_eq!(report.progress.completed, 60);
        assert_eq!(report.counts.success, 60);
        for ranking in &report.servers {
            assert_eq!(ranking.outcomes.len(), 5);
        }
    }

    #[tokio::test]
    async fn test_events_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(Arc::new(FakeResolver::default())).with_events(tx);
        let config = RunConfig::multi(servers(&["a", "b"]), vec!["x.com".into(), "y.com".into()]);

        scheduler.run(&config).await;
        drop(scheduler);

        let mut outcomes = 0;
        let mut last_completed = 0;
        let mut finished = 0;
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Started { total } => assert_eq!(total, 4),
                RunEvent::Outcome(outcome) => {
                    assert_eq!(outcome.kind, OutcomeKind::Success);
                    outcomes += 1;
                }
                RunEvent::Progress(snapshot) => {
                    assert!(snapshot.completed <= snapshot.total);
                    if snapshot.is_complete() {
                        finished += 1;
                    }
                    last_completed = last_completed.max(snapshot.completed);
                }
                RunEvent::ConfigError(msg) => panic!("unexpected config error: {msg}"),
                RunEvent::Completed(report) => assert_eq!(report.progress.completed, 4),
            }
        }
        assert_eq!(outcomes, 4);
        assert_eq!(last_completed, 4);
        assert_eq!(finished, 1);
    }

    #[tokio::test]
    async fn test_empty_server_list_is_a_noop_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(Arc::new(FakeResolver::default())).with_events(tx);
        let config = RunConfig::single(Vec::new(), "example.com".into());

        let report = scheduler.run(&config).await;
        assert_eq!(report.progress.total, 0);
        assert!(report.servers.is_empty());

        assert!(matches!(rx.recv().await, Some(RunEvent::ConfigError(_))));
        assert!(matches!(rx.recv().await, Some(RunEvent::Completed(_))));
    }

    #[tokio::test]
    async fn test_engine_rejects_overlapping_runs() {
        let engine = Engine::new(FakeResolver::default().answer("a", 200));
        let config = RunConfig::single(servers(&["a"]), "example.com".into());

        let background = engine.clone();
        let first_config = config.clone();
        let first = tokio::spawn(async move { background.start_run(first_config).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.is_running());
        assert!(matches!(
            engine.start_run(config.clone()).await,
            Err(Error::RunInProgress)
        ));

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.progress.completed, 1);
        assert!(!engine.is_running());
        assert!(engine.start_run(config).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_run_stops_its_probes() {
        let names = ["s1", "s2", "s3", "s4", "s5"];
        let mut resolver = FakeResolver::default().answer("next", 5);
        for name in names {
            resolver = resolver.answer(name, 300);
        }
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(resolver).with_events(tx);

        let first = RunConfig::single(servers(&names), "example.com".into());
        let cut = tokio::time::timeout(Duration::from_millis(50), engine.start_run(first)).await;
        assert!(cut.is_err());
        assert!(!engine.is_running());

        let second = RunConfig::single(servers(&["next"]), "example.com".into());
        let report = engine.start_run(second).await.unwrap();
        assert_eq!(report.progress, ProgressSnapshot { completed: 1, total: 1 });

        // Outlive the probes of the first run
        tokio::time::sleep(Duration::from_millis(400)).await;
        drop(engine);

        let mut settled = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Outcome(outcome) => settled.push(outcome.server.to_string()),
                RunEvent::Progress(snapshot) => assert_eq!(snapshot.total, 1),
                _ => {}
            }
        }
        assert_eq!(settled, vec!["next"]);
    }
}
