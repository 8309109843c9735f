use std::sync::Arc;

use log2::*;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::scrape::fetch_page;
use super::state::CrawlStateRef;

/// Crawl until the frontier runs dry, a limit is hit or the job is cancelled,
/// then mark the job done.
pub async fn crawl(state: CrawlStateRef, client: Client, cancel: CancellationToken) {
    let config = Arc::clone(state.config());
    let in_flight = Arc::new(Semaphore::new(config.max_in_flight));

    state.enqueue(config.origin.seed()).await;
    info!("Job {}: crawling {} for '{}'", state.id(), config.origin.seed(), state.keyword());

    let mut wave = 0;
    while state.frontier_size() > 0 && state.under_limits() && !cancel.is_cancelled() {
        wave += 1;
        let dispatched = run_wave(&state, &client, &in_flight, &cancel).await;
        debug!(
            "Job {}: wave {} fetched {} pages (visited {}, results {}, frontier {})",
            state.id(),
            wave,
            dispatched,
            state.visited_size(),
            state.results_size(),
            state.frontier_size()
        );
    }

    if cancel.is_cancelled() {
        info!("Job {}: cancelled after {} waves", state.id(), wave);
    }
    if state.mark_done() {
        info!(
            "Job {}: done, {} matching pages out of {} visited",
            state.id(),
            state.results_size(),
            state.visited_size()
        );
    }
}

/// Dispatch one fetch task per URL that was pending when the wave began and
/// return once all of them finished. Returns the number of tasks dispatched.
async fn run_wave(
    state: &CrawlStateRef,
    client: &Client,
    in_flight: &Arc<Semaphore>,
    cancel: &CancellationToken,
) -> usize {
    let tracker = TaskTracker::new();
    let wave_size = state.frontier_size();
    let mut dispatched = 0;

    for _ in 0..wave_size {
        if !state.under_limits() || cancel.is_cancelled() {
            break;
        }
        let Some(url) = state.pop().await else {
            break;
        };
        if !state.dequeue_and_mark(&url) {
            continue;
        }

        let state = Arc::clone(state);
        let client = client.clone();
        let in_flight = Arc::clone(in_flight);
        let cancel = cancel.clone();

        tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    trace!("Job {}: abandoned {}", state.id(), url);
                }
                _ = async {
                    let Ok(_permit) = in_flight.acquire().await else {
                        return;
                    };
                    process_url(&state, &client, &url).await;
                } => {}
            }
        });
        dispatched += 1;
    }

    // Tasks still running keep the wave open after close()
    tracker.close();
    tracker.wait().await;
    dispatched
}

async fn process_url(state: &CrawlStateRef, client: &Client, url: &str) {
    let config = state.config();

    let page = match fetch_page(url, state.needle(), client, config).await {
        Ok(page) => page,
        Err(e) => {
            debug!("Job {}: no contribution from {}: {}", state.id(), url, e);
            return;
        }
    };

    if page.keyword_found && state.record_result(url) {
        info!("Job {}: keyword found at {}", state.id(), url);
    }

    for link in page.links {
        if !state.under_limits() {
            break;
        }
        if let Some(canonical) = config.origin.canonicalize(&link) {
            state.enqueue(canonical).await;
        }
    }
}
