//! DNS module.
//!
//! This module provides the probing engine:
//! - Single-lookup probes with timeout and failure classification
//! - A thread-safe result store and progress counter
//! - The concurrent scheduler and run engine
//! - Ranking and per-domain summaries
//! - Core data types

pub mod probe;
pub mod progress;
pub mod scheduler;
pub mod store;
pub mod summary;
pub mod types;

pub use probe::{LookupError, Resolve, TrustDnsResolver};
pub use progress::ProgressTracker;
pub use scheduler::{Engine, EventReceiver, EventSender, RunConfig, RunEvent, RunMode, Scheduler};
pub use store::{DomainSample, ResultStore, ServerStats};
pub use summary::{DomainSummary, OutcomeCounts, RunReport, ServerRanking};
pub use types::*;
