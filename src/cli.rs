//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports an interactive mode, a one-shot benchmark run, listing the
//! loaded servers and domains, and shell completion generation.

use crate::config::ConfigLoader;
use crate::dns::scheduler::{RunConfig, DEFAULT_DOMAIN, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};
use crate::dns::types::{Domain, Server};
use crate::error::{Error, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// CLI argument parser using clap derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "dnsrank",
    version,
    about = "DNS resolution latency benchmark",
    long_about = "Measures how fast a set of DNS servers resolve a set of domains, ranks \
                  the servers, and summarizes per-domain latency",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// TSV format (tab-separated)
    Tsv,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json", "csv", "tsv"]
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

/// Where the server and domain lists come from.
#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    /// DNS server list file (one address per line)
    #[arg(short, long, env = "DNSRANK_SERVERS")]
    pub file: Option<PathBuf>,

    /// Domain list file (one hostname per line)
    #[arg(long = "domains", env = "DNSRANK_DOMAINS")]
    pub domains_file: Option<PathBuf>,

    /// Custom DNS servers (IP, IP:port or [IPv6]:port)
    #[arg(long = "dns")]
    pub dns_servers: Vec<String>,
}

impl ListArgs {
    /// Load servers from `--dns`, `--file`, or the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if no list can be loaded.
    pub fn load_servers(&self) -> Result<Vec<Server>> {
        if !self.dns_servers.is_empty() {
            return ConfigLoader::servers_from_args(self.dns_servers.clone());
        }
        match &self.file {
            Some(path) => ConfigLoader::load_servers(path),
            None => ConfigLoader::load_default_servers(),
        }
    }

    /// Load domains from `--domains` or the default location.
    ///
    /// A list without any entry falls back to the built-in domain, the
    /// same as a missing one.
    ///
    /// # Errors
    ///
    /// Returns an error if a given list cannot be read.
    pub fn load_domains(&self) -> Result<Vec<Domain>> {
        let domains = match &self.domains_file {
            Some(path) => ConfigLoader::load_domains(path)?,
            None => ConfigLoader::load_default_domains()?,
        };
        if domains.is_empty() {
            tracing::debug!("domain list is empty, using {DEFAULT_DOMAIN}");
            return Ok(vec![Domain::new(DEFAULT_DOMAIN)]);
        }
        Ok(domains)
    }
}

/// Parameters of a benchmark run.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub lists: ListArgs,

    /// Domain to resolve (single-domain mode)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Resolve every domain of the domain list (multi-domain mode)
    #[arg(short, long, conflicts_with = "domain")]
    pub all_domains: bool,

    /// Per-probe timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "DNSRANK_TIMEOUT")]
    pub timeout: u64,

    /// Number of concurrent probes
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, env = "DNSRANK_WORKERS")]
    pub workers: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            lists: ListArgs::default(),
            domain: None,
            all_domains: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl RunArgs {
    /// Build the run configuration from the loaded lists.
    ///
    /// Single-domain mode uses `--domain`, or the first listed domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the lists cannot be loaded or the timeout is zero.
    pub fn to_config(&self) -> Result<RunConfig> {
        if self.timeout == 0 {
            return Err(Error::config("timeout must be at least 1 second"));
        }
        let servers = self.lists.load_servers()?;
        let catalog = self.lists.load_domains()?;

        let config = if self.all_domains {
            RunConfig::multi(servers, catalog)
        } else {
            let domain = self
                .domain
                .clone()
                .map(Domain::new)
                .or_else(|| catalog.first().cloned())
                .ok_or_else(|| Error::config("no domain to resolve"))?;
            RunConfig::single(servers, domain).with_catalog(catalog)
        };

        Ok(config
            .with_timeout(Duration::from_secs(self.timeout))
            .with_workers(self.workers))
    }
}

/// Available commands for the dnsrank CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal user interface (TUI).
    ///
    /// Type a domain, start a run, and watch servers settle live.
    #[command(alias = "i")]
    Interactive {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run one benchmark and print the ranking.
    ///
    /// Probes every server against the selected domain(s) and prints servers
    /// ordered by mean latency, followed by per-domain summaries.
    #[command(alias = "r")]
    Run {
        #[command(flatten)]
        run: RunArgs,
    },

    /// List the loaded DNS servers and domains.
    #[command(alias = "l")]
    List {
        #[command(flatten)]
        lists: ListArgs,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Parse CLI arguments and return verbose flag.
///
/// # Returns
///
/// Returns a tuple of `(Cli, verbose)` where `verbose` indicates
/// whether verbose logging was enabled.
#[must_use]
pub fn parse_verbose() -> (Cli, bool) {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    (cli, verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::scheduler::RunMode;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("tsv".parse::<OutputFormat>(), Ok(OutputFormat::Tsv));
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_single_domain() {
        let cli = Cli::try_parse_from([
            "dnsrank", "run", "--dns", "1.1.1.1", "--dns", "8.8.8.8", "-d", "example.org", "-t",
            "3", "-w", "4",
        ])
        .unwrap();
        let Some(Commands::Run { run }) = cli.command else {
            panic!("expected run command");
        };

        let config = run.to_config().unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.mode, RunMode::Single("example.org".into()));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = Cli::try_parse_from(["dnsrank", "run", "--dns", "1.1.1.1", "-t", "0"]).unwrap();
        let Some(Commands::Run { run }) = cli.command else {
            panic!("expected run command");
        };
        assert!(matches!(run.to_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_comment_only_domain_list_uses_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here yet\n\n").unwrap();

        let run = RunArgs {
            lists: ListArgs {
                domains_file: Some(file.path().to_path_buf()),
                dns_servers: vec!["1.1.1.1".to_string()],
                ..ListArgs::default()
            },
            ..RunArgs::default()
        };
        let config = run.to_config().unwrap();

        assert_eq!(config.mode, RunMode::Single(DEFAULT_DOMAIN.into()));
        assert_eq!(config.catalog, vec![Domain::new(DEFAULT_DOMAIN)]);
    }

    #[test]
    fn test_domain_conflicts_with_all_domains() {
        let result = Cli::try_parse_from(["dnsrank", "run", "-d", "example.com", "--all-domains"]);
        assert!(result.is_err());
    }
}
