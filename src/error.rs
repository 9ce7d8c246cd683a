//! Error types module.
//!
//! This module defines the run-level error types used throughout dnsrank.
//! Individual probe failures are not errors: they are classified into an
//! [`OutcomeKind`](crate::dns::OutcomeKind) and recorded like any other
//! result.

use thiserror::Error;

/// A specialized `Result` type for dnsrank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for dnsrank.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (list files, terminal, stdout)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (report output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// DNS resolver construction error
    #[error("DNS resolver error: {0}")]
    Resolver(#[from] trust_dns_resolver::error::ResolveError),

    /// Configuration error (missing lists, empty selection)
    #[error("Config error: {0}")]
    Config(String),

    /// Parse error (malformed server address, bad input)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A run was requested while another one is still active
    #[error("A run is already in progress")]
    RunInProgress,
}

impl Error {
    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error with a message.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
