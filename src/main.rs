//! dnsrank - DNS resolution latency benchmark
//!
//! Binary entry point for the dnsrank CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use clap::CommandFactory;
use dnsrank::cli::{Cli, Commands, ListArgs, OutputFormat, RunArgs};
use dnsrank::dns::{Engine, RunEvent, RunReport, TrustDnsResolver};
use dnsrank::error::Result;
use dnsrank::tui::App;
use std::io::Write;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set up logging based on verbosity level.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

/// Run one benchmark, streaming progress to stderr, and print the report.
async fn run_benchmark(args: RunArgs, format: OutputFormat) -> Result<()> {
    let config = args.to_config()?;
    eprintln!(
        "Probing {} servers x {} domain(s)...",
        config.servers.len(),
        config.selection().len()
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Engine::new(TrustDnsResolver::new()).with_events(tx);

    let printer = tokio::spawn(async move {
        let mut stderr = std::io::stderr();
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Progress(snapshot) => {
                    let _ = write!(stderr, "\rProgress: {snapshot}");
                    let _ = stderr.flush();
                }
                RunEvent::ConfigError(msg) => {
                    let _ = writeln!(stderr, "Config error: {msg}");
                }
                RunEvent::Completed(_) => {
                    let _ = writeln!(stderr);
                }
                RunEvent::Started { .. } | RunEvent::Outcome(_) => {}
            }
        }
    });

    let report = engine.start_run(config).await?;
    drop(engine);
    let _ = printer.await;

    match format {
        OutputFormat::Table => print_report_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Csv => print_report_delimited(&report, ","),
        OutputFormat::Tsv => print_report_delimited(&report, "\t"),
    }

    Ok(())
}

/// Print results in table format.
fn print_report_table(report: &RunReport) {
    println!("{:<4} {:<32} {:<16} {:<6}", "#", "DNS server", "Response time", "Band");
    println!("{}", "-".repeat(62));
    for (idx, r) in report.servers.iter().enumerate() {
        println!(
            "{:<4} {:<32} {:<16} {:<6}",
            idx + 1,
            r.server,
            r.latency.to_string(),
            r.band.as_str()
        );
    }

    println!();
    println!("{:<36} {:<16} {:<6}", "Domain", "Mean (<50 ms)", "Band");
    println!("{}", "-".repeat(62));
    for d in &report.domains {
        println!(
            "{:<36} {:<16} {:<6}",
            d.domain,
            d.latency.to_string(),
            d.band.map_or("-", |b| b.as_str())
        );
    }

    println!("\n=== Summary ===");
    println!("Probes: {}", report.progress);
    println!("Success: {}", report.counts.success);
    println!(
        "Failed: {} (NXDOMAIN {}, no nameservers {}, timeout {}, other {})",
        report.counts.failed(),
        report.counts.nxdomain,
        report.counts.no_nameservers,
        report.counts.timeout,
        report.counts.other
    );
    if let Some(best) = report.best() {
        println!("Fastest: {} ({})", best.server, best.latency);
    }
    println!("Elapsed: {:.2} s", report.elapsed.as_secs_f64());
}

/// Print results as CSV or TSV.
fn print_report_delimited(report: &RunReport, sep: &str) {
    println!("#Rank{sep}Server{sep}Latency(ms){sep}Band{sep}Successes");
    for (idx, r) in report.servers.iter().enumerate() {
        let latency = r.latency.ms().unwrap_or(-1.0);
        println!(
            "{}{sep}{}{sep}{:.2}{sep}{}{sep}{}",
            idx + 1,
            r.server,
            latency,
            r.band,
            r.successes
        );
    }
}

/// List loaded servers and domains.
fn run_list(lists: &ListArgs) -> Result<()> {
    let servers = lists.load_servers()?;
    let domains = lists.load_domains()?;

    println!("DNS servers ({}):", servers.len());
    for (idx, s) in servers.iter().enumerate() {
        println!("{:<4} {}", idx + 1, s);
    }
    println!("\nDomains ({}):", domains.len());
    for (idx, d) in domains.iter().enumerate() {
        println!("{:<4} {}", idx + 1, d);
    }

    Ok(())
}

/// Run interactive TUI mode.
async fn run_interactive(args: RunArgs) -> Result<()> {
    let config = args.to_config()?;
    let mut app = App::new(config);
    app.run().await
}

/// Main entry point for the dnsrank CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("dnsrank crashed: {}", panic_info);
    }));

    let (cli, verbose) = dnsrank::cli::parse_verbose();
    let interactive = matches!(cli.command, None | Some(Commands::Interactive { .. }));
    // Log output would tear the alternate screen
    setup_logging(verbose, cli.quiet || interactive);

    tracing::debug!("dnsrank starting...");

    match cli.command {
        Some(Commands::Interactive { run }) => run_interactive(run).await?,
        Some(Commands::Run { run }) => run_benchmark(run, cli.format).await?,
        Some(Commands::List { lists }) => run_list(&lists)?,
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "dnsrank", &mut std::io::stdout());
        }
        // Default to interactive mode
        None => run_interactive(RunArgs::default()).await?,
    }

    Ok(())
}
