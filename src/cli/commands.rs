//! CLI definitions for dispatcher-server.

use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::dispatch::{TrackerConfig, WorkTracker};
use crate::linefile::{LineReader, OrderedWriter};
use crate::server::{DispatchServer, ServerConfig};

/// Default bind address.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
const DEFAULT_PORT: u16 = 8000;

/// Default issuance timeout in seconds.
const DEFAULT_WORK_TIMEOUT: u64 = 600;

/// Default retry budget.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry hint in seconds.
const DEFAULT_RETRY_BACKOFF: u64 = 30;

/// Line-indexed work dispatcher server.
#[derive(Parser)]
#[command(name = "dispatcher-server")]
#[command(about = "Dispatch lines of an input file to remote workers, persisting results in order")]
#[command(version)]
#[command(
    long_about = "dispatcher-server hands out the lines of --infile to any number of HTTP \
workers and appends their results to --outfile in exact input order.\n\nThe process exits 0 \
once every line has been persisted; restarting with the same files resumes where the output \
file left off."
)]
pub struct Cli {
    /// Input file; each line is one work item.
    #[arg(long)]
    pub infile: String,

    /// Output file; line n receives the result for input line n.
    #[arg(long)]
    pub outfile: String,

    /// Bind address.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds before issued work is considered lost and re-queued.
    #[arg(
        long,
        default_value_t = DEFAULT_WORK_TIMEOUT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub work_timeout: u64,

    /// Timed-out issuances tolerated before a line is written as a tombstone.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Retry hint (seconds) returned to workers when nothing is issuable yet.
    #[arg(
        long,
        default_value_t = DEFAULT_RETRY_BACKOFF,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub retry_backoff: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Parses CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the dispatcher server until all work is persisted.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let reader = LineReader::open(&cli.infile)?;
    let writer = OrderedWriter::open(&cli.outfile)?;

    let config = TrackerConfig::default()
        .with_work_timeout(Duration::from_secs(cli.work_timeout))
        .with_max_retries(cli.max_retries)
        .with_retry_backoff(Duration::from_secs(cli.retry_backoff));
    let tracker = WorkTracker::new(reader, writer, config)?;

    info!(
        infile = %cli.infile,
        outfile = %cli.outfile,
        work_timeout = cli.work_timeout,
        max_retries = cli.max_retries,
        "dispatcher starting"
    );

    let server = DispatchServer::new(
        ServerConfig {
            host: cli.host,
            port: cli.port,
        },
        tracker,
    );
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["dispatcher-server", "--infile", "in.txt", "--outfile", "out.txt"]);

        assert_eq!(cli.infile, "in.txt");
        assert_eq!(cli.outfile, "out.txt");
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.work_timeout, 600);
        assert_eq!(cli.max_retries, 3);
        assert_eq!(cli.retry_backoff, 30);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "dispatcher-server",
            "--infile",
            "in.txt",
            "--outfile",
            "out.txt",
            "--host",
            "0.0.0.0",
            "--port",
            "9100",
            "--work-timeout",
            "120",
            "--max-retries",
            "5",
        ]);

        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9100);
        assert_eq!(cli.work_timeout, 120);
        assert_eq!(cli.max_retries, 5);
    }

    #[test]
    fn test_cli_requires_files() {
        let result = Cli::try_parse_from(["dispatcher-server"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_work_timeout() {
        // Same lower bound the /work_timeout endpoint enforces at runtime.
        let result = Cli::try_parse_from([
            "dispatcher-server",
            "--infile",
            "in.txt",
            "--outfile",
            "out.txt",
            "--work-timeout",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_retry_backoff() {
        let result = Cli::try_parse_from([
            "dispatcher-server",
            "--infile",
            "in.txt",
            "--outfile",
            "out.txt",
            "--retry-backoff",
            "0",
        ]);
        assert!(result.is_err());
    }
}
