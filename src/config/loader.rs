//! Server and domain list loader.
//!
//! This module loads the name servers and target domains a run uses from
//! plain text files, command-line arguments, or default locations. Both
//! list formats hold one entry per line; blank lines and lines starting
//! with `#` are skipped.

use crate::dns::scheduler::DEFAULT_DOMAIN;
use crate::dns::types::{Domain, Server};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Default server list file name.
pub const SERVERS_FILE: &str = "dns_servers.txt";

/// Default domain list file name.
pub const DOMAINS_FILE: &str = "domains.txt";

/// List configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Split list text into entries, dropping blanks and `#` comments.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let entries = ConfigLoader::parse_list("# public\n1.1.1.1\n\n8.8.8.8\n");
    /// assert_eq!(entries, vec!["1.1.1.1", "8.8.8.8"]);
    /// ```
    #[must_use]
    pub fn parse_list(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    /// Load servers from a list file, keeping the first of any duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load_servers<P: AsRef<Path>>(path: P) -> Result<Vec<Server>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let servers = Self::dedup(Self::parse_list(&content))
            .into_iter()
            .map(Server::new)
            .collect::<Vec<_>>();
        tracing::info!(
            "loaded {} DNS servers from {}",
            servers.len(),
            path.as_ref().display()
        );
        Ok(servers)
    }

    /// Load domains from a list file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load_domains<P: AsRef<Path>>(path: P) -> Result<Vec<Domain>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let domains = Self::dedup(Self::parse_list(&content))
            .into_iter()
            .map(Domain::new)
            .collect::<Vec<_>>();
        tracing::info!(
            "loaded {} domains from {}",
            domains.len(),
            path.as_ref().display()
        );
        Ok(domains)
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dnsrank")
    }

    /// Candidate locations for a list file, in search order.
    fn candidates(file_name: &str) -> [PathBuf; 2] {
        [Self::config_dir().join(file_name), PathBuf::from(file_name)]
    }

    /// Load servers from the default locations.
    ///
    /// Searches in the following order:
    /// 1. `$CONFIG_DIR/dnsrank/dns_servers.txt`
    /// 2. `dns_servers.txt` in current directory
    ///
    /// # Errors
    ///
    /// Returns an error if no server list is found.
    pub fn load_default_servers() -> Result<Vec<Server>> {
        Self::candidates(SERVERS_FILE)
            .iter()
            .find(|path| path.is_file())
            .map(Self::load_servers)
            .unwrap_or_else(|| {
                Err(Error::config(format!(
                    "No DNS server list found. Create {} or pass --dns.",
                    Self::config_dir().join(SERVERS_FILE).display()
                )))
            })
    }

    /// Load domains from the default locations, falling back to the
    /// built-in single domain when no list exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a list file exists but cannot be read.
    pub fn load_default_domains() -> Result<Vec<Domain>> {
        match Self::candidates(DOMAINS_FILE)
            .iter()
            .find(|path| path.is_file())
        {
            Some(path) => Self::load_domains(path),
            None => {
                tracing::debug!("no domain list found, using {DEFAULT_DOMAIN}");
                Ok(vec![Domain::new(DEFAULT_DOMAIN)])
            }
        }
    }

    /// Create a server list from command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument is blank.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let args = vec!["8.8.8.8".to_string(), "1.1.1.1:53".to_string()];
    /// let servers = ConfigLoader::servers_from_args(args)?;
    /// ```
    pub fn servers_from_args(args: Vec<String>) -> Result<Vec<Server>> {
        let mut entries = Vec::with_capacity(args.len());
        for arg in args {
            let trimmed = arg.trim();
            if trimmed.is_empty() {
                return Err(Error::parse("empty DNS server address"));
            }
            entries.push(trimmed.to_string());
        }
        Ok(Self::dedup(entries).into_iter().map(Server::new).collect())
    }

    /// Remove repeated entries, keeping the first occurrence.
    fn dedup(entries: Vec<String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        entries
            .into_iter()
            .filter(|entry| seen.insert(entry.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_list_skips_comments_and_blanks() {
        let content = "# public resolvers\n1.1.1.1\n\n   \n  8.8.8.8  \n#9.9.9.9\n";
        assert_eq!(ConfigLoader::parse_list(content), vec!["1.1.1.1", "8.8.8.8"]);
    }

    #[test]
    fn test_load_servers_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "1.1.1.1").unwrap();
        writeln!(file, "8.8.8.8").unwrap();
        writeln!(file, "1.1.1.1").unwrap();

        let servers = ConfigLoader::load_servers(file.path()).unwrap();
        assert_eq!(servers, vec![Server::new("1.1.1.1"), Server::new("8.8.8.8")]);
    }

    #[test]
    fn test_load_domains_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "example.com\n\n# skip\nexample.org").unwrap();

        let domains = ConfigLoader::load_domains(file.path()).unwrap();
        assert_eq!(domains, vec![Domain::new("example.com"), "example.org".into()]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ConfigLoader::load_servers("/nonexistent/dns_servers.txt");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_servers_from_args() {
        let args = vec!["8.8.8.8".to_string(), " 1.1.1.1 ".to_string()];
        let servers = ConfigLoader::servers_from_args(args).unwrap();
        assert_eq!(servers, vec![Server::new("8.8.8.8"), Server::new("1.1.1.1")]);

        let result = ConfigLoader::servers_from_args(vec!["  ".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_identity_is_exact_string() {
        let args = vec!["8.8.8.8".to_string(), "8.8.8.8:53".to_string()];
        let servers = ConfigLoader::servers_from_args(args).unwrap();
        assert_eq!(servers.len(), 2);
    }
}
