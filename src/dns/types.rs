//! DNS types and data structures.
//!
//! This module provides the core value types shared by the probing engine:
//! servers and domains, probe outcomes, progress snapshots, and the
//! severity bands used to classify latencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default DNS port used when a server string carries no port.
pub const DNS_PORT: u16 = 53;

/// Upper bound (exclusive, milliseconds) of the "good" band.
pub const GOOD_THRESHOLD_MS: f64 = 50.0;

/// Upper bound (exclusive, milliseconds) of the "fair" band.
pub const FAIR_THRESHOLD_MS: f64 = 200.0;

/// Upper bound (exclusive, milliseconds) of the "poor" band.
pub const POOR_THRESHOLD_MS: f64 = 500.0;

/// A name-server endpoint.
///
/// Identity is the exact address string: `8.8.8.8` and `8.8.8.8:53` are two
/// different servers even though they reach the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Server(String);

impl Server {
    /// Create a server from its address string.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let server = Server::new("1.1.1.1");
    /// ```
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address string as loaded.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the address string into a socket address.
    ///
    /// Accepts `1.1.1.1`, `1.1.1.1:5353`, `2606:4700::1111` and
    /// `[2606:4700::1111]:53`. A missing port defaults to 53.
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let trimmed = self.0.trim();
        if let Ok(addr) = trimmed.parse::<SocketAddr>() {
            return Some(addr);
        }
        trimmed
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, DNS_PORT))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Server {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A hostname to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Create a domain from its hostname.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The hostname as loaded.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully-qualified form (trailing dot) handed to the resolver.
    #[must_use]
    pub fn fqdn(&self) -> String {
        if self.0.ends_with('.') {
            self.0.clone()
        } else {
            format!("{}.", self.0)
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Classification of a single probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum OutcomeKind {
    /// The server answered the address query
    Success,
    /// The domain does not exist
    Nxdomain,
    /// The server produced no usable answer (SERVFAIL, REFUSED, unreachable)
    NoNameservers,
    /// The request exceeded the per-probe timeout
    Timeout,
    /// Any other transport or protocol error
    Other(String),
}

impl OutcomeKind {
    /// Check if the outcome is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short human-readable label for failures.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Success => "OK".to_string(),
            Self::Nxdomain => "NXDOMAIN".to_string(),
            Self::NoNameservers => "No nameservers".to_string(),
            Self::Timeout => "Timeout".to_string(),
            Self::Other(msg) => format!("Error: {msg}"),
        }
    }
}

/// Result of one (server, domain) probe.
///
/// Created once per probe and handed to the result store; `elapsed` is only
/// meaningful when `kind` is [`OutcomeKind::Success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// The probed server
    pub server: Server,
    /// The resolved domain
    pub domain: Domain,
    /// Wall-clock time from request to response or timeout
    pub elapsed: Duration,
    /// Classification of the result
    pub kind: OutcomeKind,
}

impl ProbeOutcome {
    /// Create an outcome.
    #[must_use]
    pub fn new(server: Server, domain: Domain, elapsed: Duration, kind: OutcomeKind) -> Self {
        Self {
            server,
            domain,
            elapsed,
            kind,
        }
    }

    /// Latency in milliseconds, `None` unless the probe succeeded.
    #[must_use]
    pub fn latency_ms(&self) -> Option<f64> {
        self.kind
            .is_success()
            .then(|| self.elapsed.as_secs_f64() * 1000.0)
    }

    /// Display string recorded in the server's outcome list.
    #[must_use]
    pub fn display(&self) -> String {
        match self.latency_ms() {
            Some(ms) => format_ms(ms),
            None => self.kind.label(),
        }
    }
}

/// Completed/total counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Probes settled so far
    pub completed: usize,
    /// Probes in the run, fixed at run start
    pub total: usize,
}

impl ProgressSnapshot {
    /// Completion as an integer percentage (0 when the run is empty).
    #[must_use]
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            0
        } else {
            ((self.completed as f64 / self.total as f64) * 100.0).min(100.0) as u16
        }
    }

    /// Check if every probe has settled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.completed, self.total, self.percent())
    }
}

/// Four-step latency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    /// Below 50 ms
    Good,
    /// 50 ms up to 200 ms
    Fair,
    /// 200 ms up to 500 ms
    Poor,
    /// 500 ms and above, or no successful answer
    Bad,
}

impl SeverityBand {
    /// Classify a latency; `None` (failure) is always [`SeverityBand::Bad`].
    #[must_use]
    pub fn from_latency(latency_ms: Option<f64>) -> Self {
        match latency_ms {
            Some(ms) if ms < GOOD_THRESHOLD_MS => Self::Good,
            Some(ms) if ms < FAIR_THRESHOLD_MS => Self::Fair,
            Some(ms) if ms < POOR_THRESHOLD_MS => Self::Poor,
            _ => Self::Bad,
        }
    }

    /// Lowercase band name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Bad => "bad",
        }
    }
}

impl fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A server's mean latency, or the sentinel for "no successful probe".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "ms")]
pub enum Latency {
    /// Mean of successful probes, in milliseconds
    Measured(f64),
    /// No probe succeeded; sorts after every measured value
    Timeout,
}

impl Latency {
    /// Build from an optional mean.
    #[must_use]
    pub fn from_mean(mean_ms: Option<f64>) -> Self {
        mean_ms.map_or(Self::Timeout, Self::Measured)
    }

    /// The measured value, if any.
    #[must_use]
    pub fn ms(&self) -> Option<f64> {
        match self {
            Self::Measured(ms) => Some(*ms),
            Self::Timeout => None,
        }
    }

    /// Total order with [`Latency::Timeout`] last.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Self::Measured(a), Self::Measured(b)) => a.total_cmp(b),
            (Self::Measured(_), Self::Timeout) => Ordering::Less,
            (Self::Timeout, Self::Measured(_)) => Ordering::Greater,
            (Self::Timeout, Self::Timeout) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(ms) => f.pad(&format_ms(*ms)),
            Self::Timeout => f.pad("Timeout"),
        }
    }
}

/// A domain's summarized latency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "ms")]
pub enum DomainLatency {
    /// Mean of the qualifying samples, in milliseconds
    Measured(f64),
    /// Probed, but no sample qualified
    TimedOut,
    /// Not part of the run's selection
    Untested,
}

impl DomainLatency {
    /// The measured value, if any.
    #[must_use]
    pub fn ms(&self) -> Option<f64> {
        match self {
            Self::Measured(ms) => Some(*ms),
            Self::TimedOut | Self::Untested => None,
        }
    }
}

impl fmt::Display for DomainLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(ms) => f.pad(&format_ms(*ms)),
            Self::TimedOut => f.pad("Timeout"),
            Self::Untested => f.pad("Untested"),
        }
    }
}

/// Format milliseconds the way every table shows them.
#[must_use]
pub fn format_ms(ms: f64) -> String {
    format!("{ms:.2} ms")
}
