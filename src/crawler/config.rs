use std::sync::Arc;
use std::time::Duration;

use super::origin::Origin;

/// Default connect timeout for page requests in seconds
pub const CONNECT_TIMEOUT_SEC: u64 = 5;
/// Default read timeout for page requests in seconds
pub const READ_TIMEOUT_SEC: u64 = 10;
/// Pages a single job may fetch
pub const MAX_PAGES: usize = 10_000;
/// Matching pages a single job may report
pub const MAX_RESULTS: usize = 100;
/// Pending URLs a single job may hold
pub const MAX_FRONTIER: usize = 50_000;
/// Fetches of a single job allowed to run at the same time
pub const MAX_IN_FLIGHT: usize = 256;

/// Configuration shared by every job of a registry
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub origin: Origin,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_pages: usize,
    pub max_results: usize,
    pub max_frontier: usize,
    pub max_in_flight: usize,
}

impl CrawlerConfig {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SEC),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SEC),
            max_pages: MAX_PAGES,
            max_results: MAX_RESULTS,
            max_frontier: MAX_FRONTIER,
            max_in_flight: MAX_IN_FLIGHT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_frontier(mut self, max_frontier: usize) -> Self {
        self.max_frontier = max_frontier;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

pub type CrawlerConfigRef = Arc<CrawlerConfig>;
