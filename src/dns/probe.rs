//! Single (server, domain) resolution probe.
//!
//! A probe issues one address-record lookup against one name server,
//! bounded by a timeout, and converts every result into a
//! [`ProbeOutcome`]. Lookups go through the [`Resolve`] trait so the
//! scheduler can be driven by a deterministic resolver in tests.

#![allow(clippy::missing_errors_doc)]

use crate::dns::types::{Domain, OutcomeKind, ProbeOutcome, Server};
use crate::error::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::error::ProtoErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::TokioAsyncResolver;

/// Classified lookup failure reported by a [`Resolve`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The domain does not exist
    #[error("domain does not exist")]
    Nxdomain,
    /// The server gave no usable answer
    #[error("no usable name server answer")]
    NoNameservers,
    /// The lookup exceeded its timeout
    #[error("lookup timed out")]
    Timeout,
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<LookupError> for OutcomeKind {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Nxdomain => Self::Nxdomain,
            LookupError::NoNameservers => Self::NoNameservers,
            LookupError::Timeout => Self::Timeout,
            LookupError::Other(msg) => Self::Other(msg),
        }
    }
}

/// Address-record lookup against one specific name server.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve the A record of `domain` using only `server`.
    async fn lookup_a(
        &self,
        server: &Server,
        domain: &Domain,
        timeout: Duration,
    ) -> std::result::Result<(), LookupError>;
}

/// Production backend built on `trust-dns-resolver`.
///
/// Each lookup gets its own resolver pointed at the probed server only,
/// with a single attempt and no cache, so every probe measures a real
/// round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustDnsResolver;

impl TrustDnsResolver {
    /// Create the backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a resolver that talks to `addr` over plain UDP.
    pub fn build(addr: SocketAddr, timeout: Duration) -> Result<TokioAsyncResolver> {
        let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], group);

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        Ok(TokioAsyncResolver::tokio(config, opts)?)
    }
}

#[async_trait]
impl Resolve for TrustDnsResolver {
    async fn lookup_a(
        &self,
        server: &Server,
        domain: &Domain,
        timeout: Duration,
    ) -> std::result::Result<(), LookupError> {
        let addr = server
            .socket_addr()
            .ok_or_else(|| LookupError::Other(format!("invalid server address: {server}")))?;
        let resolver =
            Self::build(addr, timeout).map_err(|e| LookupError::Other(e.to_string()))?;

        let name = domain.fqdn();
        resolver
            .lookup(name.as_str(), RecordType::A)
            .await
            .map(|_| ())
            .map_err(|e| classify(&e))
    }
}

/// Map a resolver error onto the probe failure taxonomy.
#[must_use]
pub fn classify(err: &ResolveError) -> LookupError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => LookupError::Nxdomain,
            ResponseCode::ServFail | ResponseCode::Refused => LookupError::NoNameservers,
            _ => LookupError::Other("no address records in answer".to_string()),
        },
        ResolveErrorKind::NoConnections => LookupError::NoNameservers,
        ResolveErrorKind::Timeout => LookupError::Timeout,
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            LookupError::Timeout
        }
        _ => LookupError::Other(err.to_string()),
    }
}

/// Run one probe.
///
/// Timing starts right before the lookup is issued and stops when it
/// settles. The lookup is also capped by `tokio::time::timeout`, so a
/// backend that never answers still settles as [`OutcomeKind::Timeout`].
pub async fn probe<R>(
    resolver: &R,
    server: &Server,
    domain: &Domain,
    limit: Duration,
) -> ProbeOutcome
where
    R: Resolve + ?Sized,
{
    let start = Instant::now();
    let result = timeout(limit, resolver.lookup_a(server, domain, limit)).await;
    let elapsed = start.elapsed();

    let kind = match result {
        Ok(Ok(())) => OutcomeKind::Success,
        Ok(Err(e)) => e.into(),
        Err(_) => OutcomeKind::Timeout,
    };

    tracing::debug!(
        %server,
        %domain,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        outcome = %kind.label(),
        "probe settled"
    );

    ProbeOutcome::new(server.clone(), domain.clone(), elapsed, kind)
}
