use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::crawler::{CrawlerConfig, Origin, config as defaults};
use crate::registry::DEFAULT_RETENTION_SEC;

/// Log levels as defined in log2 crate
#[derive(Debug, Serialize, Deserialize, Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Program arguments. `CrawlerConfig` only carries what the engine needs.
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Site to crawl; links outside its scheme, host and port are ignored
    #[arg(short, long)]
    pub base_url: String,
    /// Keywords to search for, one job each (4 to 32 characters)
    #[arg(required = true)]
    pub keywords: Vec<String>,
    /// Connect timeout per request in seconds
    #[arg(long, default_value_t = defaults::CONNECT_TIMEOUT_SEC)]
    pub connect_timeout: u64,
    /// Read timeout per request in seconds
    #[arg(long, default_value_t = defaults::READ_TIMEOUT_SEC)]
    pub read_timeout: u64,
    /// Maximum number of pages fetched per job
    #[arg(long, default_value_t = defaults::MAX_PAGES)]
    pub max_pages: usize,
    /// Maximum number of matching pages reported per job
    #[arg(long, default_value_t = defaults::MAX_RESULTS)]
    pub max_results: usize,
    /// Maximum number of pending URLs per job
    #[arg(long, default_value_t = defaults::MAX_FRONTIER)]
    pub max_frontier: usize,
    /// Maximum number of concurrent fetches per job
    #[arg(long, default_value_t = defaults::MAX_IN_FLIGHT)]
    pub max_in_flight: usize,
    /// Seconds a finished job stays queryable
    #[arg(long, default_value_t = DEFAULT_RETENTION_SEC)]
    pub retention_secs: u64,
    /// Interval between progress reports in milliseconds
    #[arg(short, long, default_value = "1000")]
    pub poll_interval_ms: u64,
    /// Write the final snapshots of all jobs to this file as JSON
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connect_timeout == 0 || self.read_timeout == 0 {
            anyhow::bail!("timeouts must be greater than 0");
        }
        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be greater than 0");
        }
        if self.max_results == 0 {
            anyhow::bail!("max_results must be greater than 0");
        }
        if self.max_frontier == 0 {
            anyhow::bail!("max_frontier must be greater than 0");
        }
        if self.max_in_flight == 0 {
            anyhow::bail!("max_in_flight must be greater than 0");
        }
        if self.retention_secs == 0 {
            anyhow::bail!("retention_secs must be greater than 0");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn crawler_config(&self) -> anyhow::Result<CrawlerConfig> {
        let origin = Origin::parse(&self.base_url)?;
        Ok(CrawlerConfig::new(origin)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_read_timeout(Duration::from_secs(self.read_timeout))
            .with_max_pages(self.max_pages)
            .with_max_results(self.max_results)
            .with_max_frontier(self.max_frontier)
            .with_max_in_flight(self.max_in_flight))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}
