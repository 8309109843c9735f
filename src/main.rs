use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use keyword_crawler::JobRegistry;
use keyword_crawler::config::Config;
use keyword_crawler::crawler::JobView;
use log2::*;

/// Indicates start time of a project, lazily initialized
pub static START_TIME: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);

#[tokio::main]
async fn main() -> Result<()> {
    let _ = *START_TIME;
    let cfg = Config::new();
    cfg.validate()?;
    let _log2 = stdout()
        .module(true) // include module name
        .module_with_line(true) // include line number from module
        .module_filter(|module| module.starts_with("keyword_crawler")) // only this crate
        .compress(false)
        .level(cfg.log_level.to_string())
        .start();

    let (registry, mut completions) = JobRegistry::new(cfg.crawler_config()?, cfg.retention())?;
    let registry = Arc::new(registry);
    let janitor = registry.spawn_janitor(cfg.retention());

    let mut pending = HashSet::new();
    for keyword in &cfg.keywords {
        match registry.start(keyword) {
            Ok(id) => {
                info!("Started job {} for '{}'", id, keyword.trim());
                pending.insert(id);
            }
            Err(e) => error!("Skipping '{}': {}", keyword, e),
        }
    }

    let mut finished: Vec<JobView> = Vec::new();
    let mut progress = tokio::time::interval(cfg.poll_interval());

    while !pending.is_empty() {
        tokio::select! {
            event = completions.recv() => {
                let Some(event) = event else { break };
                if pending.remove(&event.id) {
                    println!("{}", serde_json::to_string_pretty(&event.view)?);
                    finished.push(event.view);
                }
            }
            _ = progress.tick() => {
                for id in &pending {
                    if let Ok(view) = registry.get_state(id) {
                        info!(
                            "Job {} ({}): {} pages visited, {} pending, {} matches",
                            view.id,
                            view.keyword,
                            view.pages_visited,
                            view.frontier,
                            view.urls.len()
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling {} running jobs", registry.active_jobs());
                registry.shutdown();
            }
        }
    }

    registry.shutdown();
    janitor.await?;

    info!(
        "Finished {} jobs in {:.1}s",
        finished.len(),
        START_TIME.elapsed().as_secs_f64()
    );

    if let Some(path) = cfg.output_file {
        std::fs::write(&path, serde_json::to_string_pretty(&finished)?)?;
        info!("Results written to {:?}", path);
    }

    Ok(())
}
