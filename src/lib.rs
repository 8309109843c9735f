pub mod config;
pub mod crawler;
pub mod error;
pub mod registry;

pub use error::{CrawlError, FetchError};
pub use registry::{CompletionEvents, JobRegistry};
