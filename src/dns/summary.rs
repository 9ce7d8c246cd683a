//! Ranking and per-domain summary of a finished run.
//!
//! Runs only after the worker pool has drained, so it reads a complete
//! store.

use crate::dns::store::{DomainSample, ResultStore, ServerStats};
use crate::dns::types::{
    Domain, DomainLatency, Latency, OutcomeKind, ProgressSnapshot, SeverityBand, Server,
    GOOD_THRESHOLD_MS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Samples at or above this latency are left out of a domain's mean.
pub const DOMAIN_SAMPLE_CUTOFF_MS: f64 = GOOD_THRESHOLD_MS;

/// One row of the ranked server list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRanking {
    /// The server
    pub server: Server,
    /// Mean latency of successful probes
    pub latency: Latency,
    /// Severity band of the mean
    pub band: SeverityBand,
    /// Number of successful probes
    pub successes: usize,
    /// Display string of every outcome
    pub outcomes: Vec<String>,
}

impl From<ServerStats> for ServerRanking {
    fn from(stats: ServerStats) -> Self {
        let mean = stats.mean_latency();
        Self {
            latency: Latency::from_mean(mean),
            band: SeverityBand::from_latency(mean),
            successes: stats.successes,
            server: stats.server,
            outcomes: stats.outcomes,
        }
    }
}

/// Summarized latency of one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    /// The domain
    pub domain: Domain,
    /// Mean of qualifying samples, timed out, or untested
    pub latency: DomainLatency,
    /// Band of the mean; untested domains have none
    pub band: Option<SeverityBand>,
}

/// Outcome counts of a run, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Lookups that returned address records
    pub success: usize,
    /// Lookups answered with NXDOMAIN
    pub nxdomain: usize,
    /// Lookups with no usable server answer
    pub no_nameservers: usize,
    /// Lookups that exceeded the per-probe timeout
    pub timeout: usize,
    /// Any other failure
    pub other: usize,
}

impl OutcomeCounts {
    /// Tally the kinds of `samples`.
    #[must_use]
    pub fn tally(samples: &[DomainSample]) -> Self {
        let mut counts = Self::default();
        for sample in samples {
            match sample.kind {
                OutcomeKind::Success => counts.success += 1,
                OutcomeKind::Nxdomain => counts.nxdomain += 1,
                OutcomeKind::NoNameservers => counts.no_nameservers += 1,
                OutcomeKind::Timeout => counts.timeout += 1,
                OutcomeKind::Other(_) => counts.other += 1,
            }
        }
        counts
    }

    /// Total failures of any kind.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.nxdomain + self.no_nameservers + self.timeout + self.other
    }
}

/// Final snapshot of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Time from dispatch to drain
    pub elapsed: Duration,
    /// Final progress, `completed == total`
    pub progress: ProgressSnapshot,
    /// Outcome counts by kind
    pub counts: OutcomeCounts,
    /// Servers, fastest first
    pub servers: Vec<ServerRanking>,
    /// Domains in consideration order
    pub domains: Vec<DomainSummary>,
}

impl RunReport {
    /// An empty report for a run that dispatched nothing.
    #[must_use]
    pub fn empty(started_at: DateTime<Utc>, domains: &[Domain]) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            progress: ProgressSnapshot::default(),
            counts: OutcomeCounts::default(),
            servers: Vec::new(),
            domains: summarize_domains(&[], domains),
        }
    }

    /// Fastest server with at least one success.
    #[must_use]
    pub fn best(&self) -> Option<&ServerRanking> {
        self.servers.first().filter(|r| r.successes > 0)
    }
}

/// Order servers by mean latency ascending.
///
/// Servers without a success sort last, keeping their load order among
/// themselves.
#[must_use]
pub fn rank_servers(stats: Vec<ServerStats>) -> Vec<ServerRanking> {
    let mut ranked: Vec<ServerRanking> = stats.into_iter().map(ServerRanking::from).collect();
    ranked.sort_by(|a, b| a.latency.rank_cmp(&b.latency));
    ranked
}

/// Summarize every domain in `considered`.
///
/// A domain's mean covers only samples below [`DOMAIN_SAMPLE_CUTOFF_MS`];
/// with no qualifying sample it reports as timed out, and a domain with no
/// sample at all reports as untested.
#[must_use]
pub fn summarize_domains(samples: &[DomainSample], considered: &[Domain]) -> Vec<DomainSummary> {
    // domain -> (sum of qualifying ms, qualifying count)
    let mut by_domain: HashMap<&Domain, (f64, usize)> = HashMap::new();
    for sample in samples {
        let entry = by_domain.entry(&sample.domain).or_insert((0.0, 0));
        if let Some(ms) = sample.latency_ms.filter(|ms| *ms < DOMAIN_SAMPLE_CUTOFF_MS) {
            entry.0 += ms;
            entry.1 += 1;
        }
    }

    considered
        .iter()
        .map(|domain| {
            let latency = match by_domain.get(domain) {
                None => DomainLatency::Untested,
                Some(&(_, 0)) => DomainLatency::TimedOut,
                Some(&(sum, count)) => DomainLatency::Measured(sum / count as f64),
            };
            let band = match latency {
                DomainLatency::Untested => None,
                other => Some(SeverityBand::from_latency(other.ms())),
            };
            DomainSummary {
                domain: domain.clone(),
                latency,
                band,
            }
        })
        .collect()
}

/// Produce the ranked servers and domain summaries from a drained store.
#[must_use]
pub fn summarize(
    store: &ResultStore,
    domains_considered: &[Domain],
) -> (Vec<ServerRanking>, Vec<DomainSummary>) {
    let servers = rank_servers(store.server_stats());
    let domains = summarize_domains(&store.samples(), domains_considered);
    (servers, domains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::types::ProbeOutcome;

    fn approx(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    fn record(store: &ResultStore, server: &str, domain: &str, ms: u64, kind: OutcomeKind) {
        store.record(&ProbeOutcome::new(
            server.into(),
            domain.into(),
            Duration::from_millis(ms),
            kind,
        ));
    }

    #[test]
    fn test_mean_of_ten_and_thirty() {
        let store = ResultStore::new(&["1.1.1.1".into()]);
        record(&store, "1.1.1.1", "a.com", 10, OutcomeKind::Success);
        record(&store, "1.1.1.1", "b.com", 30, OutcomeKind::Success);

        let (servers, _) = summarize(&store, &[]);
        assert!(approx(servers[0].latency.ms(), 20.0));
        assert_eq!(servers[0].band, SeverityBand::Good);
    }

    #[test]
    fn test_failed_servers_sort_last_in_load_order() {
        let store = ResultStore::new(&[
            "dead-a".into(),
            "slow".into(),
            "dead-b".into(),
            "fast".into(),
        ]);
        record(&store, "dead-b", "a.com", 2000, OutcomeKind::Timeout);
        record(&store, "fast", "a.com", 12, OutcomeKind::Success);
        record(&store, "dead-a", "a.com", 3, OutcomeKind::NoNameservers);
        record(&store, "slow", "a.com", 250, OutcomeKind::Success);

        let (servers, _) = summarize(&store, &[]);
        let order: Vec<_> = servers.iter().map(|r| r.server.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow", "dead-a", "dead-b"]);
        assert_eq!(servers[1].band, SeverityBand::Poor);
        assert_eq!(servers[2].band, SeverityBand::Bad);
        assert_eq!(servers[3].latency, Latency::Timeout);
    }

    #[test]
    fn test_domain_with_only_slow_successes_reports_timed_out() {
        let store = ResultStore::new(&["a".into(), "b".into()]);
        record(&store, "a", "slow.com", 60, OutcomeKind::Success);
        record(&store, "b", "slow.com", 80, OutcomeKind::Success);

        let (_, domains) = summarize(&store, &["slow.com".into()]);
        assert_eq!(domains[0].latency, DomainLatency::TimedOut);
        assert_eq!(domains[0].band, Some(SeverityBand::Bad));
    }

    #[test]
    fn test_domain_mean_uses_fast_samples_only() {
        let store = ResultStore::new(&["a".into(), "b".into(), "c".into()]);
        record(&store, "a", "x.com", 20, OutcomeKind::Success);
        record(&store, "b", "x.com", 40, OutcomeKind::Success);
        record(&store, "c", "x.com", 300, OutcomeKind::Success);
        record(&store, "c", "x.com", 2000, OutcomeKind::Timeout);

        let (_, domains) = summarize(&store, &["x.com".into()]);
        assert!(approx(domains[0].latency.ms(), 30.0));
        assert_eq!(domains[0].band, Some(SeverityBand::Good));
    }

    #[test]
    fn test_untested_domain_is_distinct_from_timed_out() {
        let store = ResultStore::new(&["a".into()]);
        record(&store, "a", "down.com", 2000, OutcomeKind::Timeout);

        let (_, domains) = summarize(&store, &["down.com".into(), "skipped.com".into()]);
        assert_eq!(domains[0].latency, DomainLatency::TimedOut);
        assert_eq!(domains[1].latency, DomainLatency::Untested);
        assert_eq!(domains[1].band, None);
        assert_eq!(domains[1].latency.to_string(), "Untested");
    }

    #[test]
    fn test_outcome_counts() {
        let store = ResultStore::new(&["a".into()]);
        record(&store, "a", "x.com", 5, OutcomeKind::Success);
        record(&store, "a", "y.com", 5, OutcomeKind::Nxdomain);
        record(&store, "a", "z.com", 5, OutcomeKind::Other("refused".into()));

        let counts = OutcomeCounts::tally(&store.samples());
        assert_eq!(counts.success, 1);
        assert_eq!(counts.nxdomain, 1);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.failed(), 2);
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::empty(Utc::now(), &["example.com".into()]);
        assert!(report.best().is_none());
        assert!(report.progress.is_complete());
        assert_eq!(report.domains[0].latency, DomainLatency::Untested);
    }
}
