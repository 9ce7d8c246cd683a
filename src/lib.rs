//! dnsrank - DNS resolution latency benchmark.
//!
//! This crate provides both a library API and a CLI tool for:
//! - Probing many name servers against many domains concurrently
//! - Classifying every lookup (success, NXDOMAIN, no nameservers, timeout, other)
//! - Ranking servers by mean latency and summarizing per-domain latency
//! - Streaming progress and per-probe outcomes to observers
//! - Interactive TUI and table/JSON/CSV/TSV output
//!
//! # Library Usage
//!
//! ```ignore
//! use dnsrank::{Engine, RunConfig, TrustDnsResolver};
//!
//! let engine = Engine::new(TrustDnsResolver::new());
//! let config = RunConfig::single(vec!["1.1.1.1".into(), "8.8.8.8".into()], "example.com".into());
//! let report = engine.start_run(config).await?;
//! for row in &report.servers {
//!     println!("{} {} {}", row.server, row.latency, row.band);
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Interactive TUI mode (default)
//! dnsrank
//!
//! # One run against a single domain
//! dnsrank run --domain example.com
//! dnsrank run --dns 1.1.1.1 --dns 8.8.8.8 --format json
//!
//! # Every server against every listed domain
//! dnsrank run --all-domains --workers 20
//!
//! # Show loaded lists
//! dnsrank list
//! ```

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod tui;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::ConfigLoader;
pub use dns::types::{Domain, OutcomeKind, ProbeOutcome, ProgressSnapshot, Server, SeverityBand};
pub use dns::{Engine, Resolve, RunConfig, RunEvent, RunReport, TrustDnsResolver};
pub use error::{Error, Result};
