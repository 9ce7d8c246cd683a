//! Thread-safe accumulator of probe outcomes.

use crate::dns::types::{Domain, Latency, OutcomeKind, ProbeOutcome, Server};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Running aggregate for one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    /// The server
    pub server: Server,
    /// Sum of successful latencies in milliseconds
    pub total_ms: f64,
    /// Number of successful probes
    pub successes: usize,
    /// Display string of every outcome, in recording order
    pub outcomes: Vec<String>,
}

impl ServerStats {
    /// Create empty stats for a server.
    #[must_use]
    pub fn new(server: Server) -> Self {
        Self {
            server,
            total_ms: 0.0,
            successes: 0,
            outcomes: Vec::new(),
        }
    }

    /// Mean latency over successful probes, `None` without any success.
    #[must_use]
    pub fn mean_latency(&self) -> Option<f64> {
        (self.successes > 0).then(|| self.total_ms / self.successes as f64)
    }

    /// Number of recorded outcomes, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }
}

/// One (domain, outcome) entry of the flat sample list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSample {
    /// The resolved domain
    pub domain: Domain,
    /// Latency in milliseconds, `None` marks a failure
    pub latency_ms: Option<f64>,
    /// Outcome classification
    pub kind: OutcomeKind,
}

#[derive(Debug, Default)]
struct Inner {
    servers: Vec<ServerStats>,
    index: HashMap<Server, usize>,
    samples: Vec<DomainSample>,
}

/// Per-server and per-domain statistics for one run.
///
/// [`ResultStore::record`] may be called concurrently from every worker.
/// Server stats are kept in load order, which the ranker relies on for a
/// stable ordering of servers without successes.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<Inner>,
}

impl ResultStore {
    /// Create a store pre-seeded with `servers` in load order.
    #[must_use]
    pub fn new(servers: &[Server]) -> Self {
        let mut inner = Inner::default();
        for server in servers {
            if !inner.index.contains_key(server) {
                inner.index.insert(server.clone(), inner.servers.len());
                inner.servers.push(ServerStats::new(server.clone()));
            }
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking writer cannot leave Inner half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one outcome.
    pub fn record(&self, outcome: &ProbeOutcome) {
        let latency_ms = outcome.latency_ms();
        let display = outcome.display();

        let mut guard = self.lock();
        let inner = &mut *guard;
        let idx = match inner.index.get(&outcome.server).copied() {
            Some(idx) => idx,
            None => {
                let idx = inner.servers.len();
                inner.index.insert(outcome.server.clone(), idx);
                inner.servers.push(ServerStats::new(outcome.server.clone()));
                idx
            }
        };

        let stats = &mut inner.servers[idx];
        if let Some(ms) = latency_ms {
            stats.total_ms += ms;
            stats.successes += 1;
        }
        stats.outcomes.push(display);

        inner.samples.push(DomainSample {
            domain: outcome.domain.clone(),
            latency_ms,
            kind: outcome.kind.clone(),
        });
    }

    /// Mean latency of `server`, [`Latency::Timeout`] without successes.
    #[must_use]
    pub fn mean_latency(&self, server: &Server) -> Latency {
        let inner = self.lock();
        let mean = inner
            .index
            .get(server)
            .and_then(|&idx| inner.servers[idx].mean_latency());
        Latency::from_mean(mean)
    }

    /// Snapshot of every server's stats in load order.
    #[must_use]
    pub fn server_stats(&self) -> Vec<ServerStats> {
        self.lock().servers.clone()
    }

    /// Snapshot of the flat (domain, outcome) sample list.
    #[must_use]
    pub fn samples(&self) -> Vec<DomainSample> {
        self.lock().samples.clone()
    }

    /// Number of outcomes recorded so far.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.lock().samples.len()
    }
}
