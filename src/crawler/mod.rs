pub mod config;
pub mod origin;
pub mod runner;
pub mod scrape;
pub mod state;


pub use config::{CrawlerConfig, CrawlerConfigRef, MAX_FRONTIER, MAX_PAGES, MAX_RESULTS};
pub use origin::Origin;
pub use runner::crawl;
pub use scrape::{PageOutcome, build_client, extract_links, fetch_page};
pub use state::{CompletionEvent, CrawlState, CrawlStateRef, JobStatus, JobView};
