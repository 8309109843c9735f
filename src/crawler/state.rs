use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashSet;
use log2::trace;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};

use super::config::CrawlerConfigRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Done,
}

/// Read snapshot of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    pub id: String,
    pub keyword: String,
    pub status: JobStatus,
    /// Matching pages, sorted
    pub urls: Vec<String>,
    pub pages_visited: usize,
    pub frontier: usize,
}

/// Emitted exactly once per job, when it reaches `Done`
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub id: String,
    pub view: JobView,
}

/// Current state of one crawl job
pub struct CrawlState {
    id: String,
    keyword: String,
    /// Lowercased keyword used for matching
    needle: String,
    config: CrawlerConfigRef,
    /// URLs waiting to be fetched, FIFO
    frontier: Mutex<VecDeque<String>>,
    frontier_len: AtomicUsize,
    /// Membership index of `frontier`
    queued: DashSet<String>,
    /// URLs handed out for fetching
    visited: DashSet<String>,
    visited_count: AtomicUsize,
    /// URLs whose body contained the keyword
    results: DashSet<String>,
    results_count: AtomicUsize,
    finished_at: OnceCell<Instant>,
    completion_tx: Option<mpsc::UnboundedSender<CompletionEvent>>,
}

impl CrawlState {
    pub fn new(
        id: String,
        keyword: String,
        config: CrawlerConfigRef,
        completion_tx: Option<mpsc::UnboundedSender<CompletionEvent>>,
    ) -> Self {
        Self {
            id,
            needle: keyword.to_lowercase(),
            keyword,
            config,
            frontier: Mutex::new(VecDeque::new()),
            frontier_len: AtomicUsize::new(0),
            queued: DashSet::new(),
            visited: DashSet::new(),
            visited_count: AtomicUsize::new(0),
            results: DashSet::new(),
            results_count: AtomicUsize::new(0),
            finished_at: OnceCell::new(),
            completion_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn config(&self) -> &CrawlerConfigRef {
        &self.config
    }

    /// Adds `url` to the back of the frontier unless it was already visited,
    /// is already queued, or the frontier is full. Overflow is dropped silently.
    pub async fn enqueue(&self, url: String) -> bool {
        if self.visited.contains(&url) {
            return false;
        }

        let mut frontier = self.frontier.lock().await;
        if frontier.len() >= self.config.max_frontier {
            trace!("Frontier of job {} full, dropping {}", self.id, url);
            return false;
        }
        if !self.queued.insert(url.clone()) {
            return false;
        }
        frontier.push_back(url);
        self.frontier_len.store(frontier.len(), Ordering::Release);
        true
    }

    /// Takes the oldest pending URL. It keeps counting as queued until
    /// `dequeue_and_mark` settles it, so it cannot be enqueued again meanwhile.
    pub async fn pop(&self) -> Option<String> {
        let mut frontier = self.frontier.lock().await;
        let url = frontier.pop_front()?;
        self.frontier_len.store(frontier.len(), Ordering::Release);
        Some(url)
    }

    /// Marks a popped `url` as visited if nobody has claimed it yet.
    /// `true` means the caller now owns fetching it. Never lets `visited` exceed `max_pages`.
    pub fn dequeue_and_mark(&self, url: &str) -> bool {
        let claimed = self.claim(url);
        self.queued.remove(url);
        claimed
    }

    fn claim(&self, url: &str) -> bool {
        if self.visited.contains(url) || !reserve(&self.visited_count, self.config.max_pages) {
            return false;
        }
        if self.visited.insert(url.to_string()) {
            true
        } else {
            self.visited_count.fetch_sub(1, Ordering::AcqRel);
            false
        }
    }

    /// Records a keyword hit. `false` once `max_results` is reached or `url` is already recorded.
    pub fn record_result(&self, url: &str) -> bool {
        if self.results.contains(url) || !reserve(&self.results_count, self.config.max_results) {
            return false;
        }
        if self.results.insert(url.to_string()) {
            true
        } else {
            self.results_count.fetch_sub(1, Ordering::AcqRel);
            false
        }
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier_len.load(Ordering::Acquire)
    }

    pub fn visited_size(&self) -> usize {
        self.visited_count.load(Ordering::Acquire)
    }

    pub fn results_size(&self) -> usize {
        self.results_count.load(Ordering::Acquire)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn under_limits(&self) -> bool {
        self.results_size() < self.config.max_results && self.visited_size() < self.config.max_pages
    }

    pub fn is_done(&self) -> bool {
        self.finished_at.get().is_some()
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at.get().copied()
    }

    /// Active -> Done. Only the first call wins and emits the completion event;
    /// later or concurrent calls are no-ops and return `false`.
    pub fn mark_done(&self) -> bool {
        if self.finished_at.set(Instant::now()).is_err() {
            return false;
        }
        if let Some(tx) = &self.completion_tx {
            let event = CompletionEvent {
                id: self.id.clone(),
                view: self.snapshot(),
            };
            // Receiver gone means nobody listens downstream
            let _ = tx.send(event);
        }
        true
    }

    pub fn results(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.results.iter().map(|url| url.key().clone()).collect();
        urls.sort();
        urls
    }

    pub fn visited_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().map(|url| url.key().clone()).collect();
        urls.sort();
        urls
    }

    pub fn snapshot(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            keyword: self.keyword.clone(),
            status: if self.is_done() {
                JobStatus::Done
            } else {
                JobStatus::Active
            },
            urls: self.results(),
            pages_visited: self.visited_size(),
            frontier: self.frontier_size(),
        }
    }
}

pub type CrawlStateRef = Arc<CrawlState>;

/// Claims one slot of `counter` if it is below `limit`
fn reserve(counter: &AtomicUsize, limit: usize) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            (count < limit).then_some(count + 1)
        })
        .is_ok()
}
