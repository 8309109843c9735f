use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log2::*;
use rand::Rng;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::crawler::{
    CompletionEvent, CrawlState, CrawlStateRef, CrawlerConfig, CrawlerConfigRef, JobView,
    build_client, crawl,
};
use crate::error::CrawlError;

pub const KEYWORD_MIN_LEN: usize = 4;
pub const KEYWORD_MAX_LEN: usize = 32;
pub const JOB_ID_LEN: usize = 8;
/// How long a finished job stays readable
pub const DEFAULT_RETENTION_SEC: u64 = 600;
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Receives one event per finished job
pub type CompletionEvents = mpsc::UnboundedReceiver<CompletionEvent>;

struct JobEntry {
    state: CrawlStateRef,
    cancel: CancellationToken,
}

/// Owns every crawl job of the process, keyed by job id
pub struct JobRegistry {
    jobs: DashMap<String, JobEntry>,
    config: CrawlerConfigRef,
    client: Client,
    retention: Duration,
    completion_tx: mpsc::UnboundedSender<CompletionEvent>,
    shutdown: CancellationToken,
}

impl JobRegistry {
    pub fn new(
        config: CrawlerConfig,
        retention: Duration,
    ) -> Result<(Self, CompletionEvents), CrawlError> {
        let client = build_client(&config)?;
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let registry = Self {
            jobs: DashMap::new(),
            config: Arc::new(config),
            client,
            retention,
            completion_tx,
            shutdown: CancellationToken::new(),
        };
        Ok((registry, completion_rx))
    }

    pub fn config(&self) -> &CrawlerConfigRef {
        &self.config
    }

    /// Registers a new job for `keyword` and starts crawling in the background.
    /// Returns the job id before any page is fetched.
    pub fn start(&self, keyword: &str) -> Result<String, CrawlError> {
        let keyword = validate_keyword(keyword)?;
        let cancel = self.shutdown.child_token();

        let state = loop {
            let id = generate_id();
            if let Entry::Vacant(slot) = self.jobs.entry(id.clone()) {
                let state = Arc::new(CrawlState::new(
                    id,
                    keyword.clone(),
                    Arc::clone(&self.config),
                    Some(self.completion_tx.clone()),
                ));
                slot.insert(JobEntry {
                    state: Arc::clone(&state),
                    cancel: cancel.clone(),
                });
                break state;
            }
        };

        info!("Job {} started for keyword '{}'", state.id(), keyword);
        let id = state.id().to_string();
        tokio::spawn(crawl(state, self.client.clone(), cancel));

        Ok(id)
    }

    pub fn get_state(&self, id: &str) -> Result<JobView, CrawlError> {
        self.jobs
            .get(id)
            .map(|entry| entry.state.snapshot())
            .ok_or_else(|| CrawlError::JobNotFound(id.to_string()))
    }

    /// Stops a job early. It still ends in `Done` with the results found so far.
    pub fn cancel(&self, id: &str) -> Result<(), CrawlError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| CrawlError::JobNotFound(id.to_string()))?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Cancels every job and stops the janitor.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Drops finished jobs older than the retention window. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| match entry.state.finished_at() {
            Some(finished_at) => finished_at.elapsed() < self.retention,
            None => true,
        });
        let evicted = before.saturating_sub(self.jobs.len());
        if evicted > 0 {
            debug!("Evicted {} finished jobs", evicted);
        }
        evicted
    }

    /// Runs `evict_expired` every `interval` until the registry shuts down.
    /// A zero interval is raised to `MIN_SWEEP_INTERVAL`.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = registry.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.evict_expired();
                    }
                }
            }
        })
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| !entry.state.is_done())
            .count()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Trims `keyword` and checks its length in characters.
pub fn validate_keyword(keyword: &str) -> Result<String, CrawlError> {
    let keyword = keyword.trim();
    let len = keyword.chars().count();
    if !(KEYWORD_MIN_LEN..=KEYWORD_MAX_LEN).contains(&len) {
        return Err(CrawlError::InvalidKeyword {
            len,
            min: KEYWORD_MIN_LEN,
            max: KEYWORD_MAX_LEN,
        });
    }
    Ok(keyword.to_string())
}

fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..JOB_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
