use std::collections::HashSet;

use log2::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};

use super::config::CrawlerConfig;
use super::origin::is_ignored_href;
use crate::error::FetchError;

/// What a fetched page contributes to a crawl
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub keyword_found: bool,
    /// Raw href values, not yet canonicalized
    pub links: HashSet<String>,
}

/// Client shared by every fetch of a registry
pub fn build_client(config: &CrawlerConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
}

/// Fetch `url` once, check it for `needle` (already lowercased) and collect its links.
pub async fn fetch_page(
    url: &str,
    needle: &str,
    client: &Client,
    config: &CrawlerConfig,
) -> Result<PageOutcome, FetchError> {
    let response = client
        .get(url)
        .timeout(config.read_timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !is_html(&content_type) {
        return Err(FetchError::NotHtml(content_type));
    }

    let body = response.text().await?;
    if body.is_empty() {
        return Err(FetchError::EmptyBody);
    }

    let outcome = PageOutcome {
        keyword_found: contains_keyword(&body, needle),
        links: extract_links(&body),
    };
    debug!("Found {} links on page {}", outcome.links.len(), url);

    Ok(outcome)
}

/// `text/html`, parameters such as charset ignored
pub fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

pub fn contains_keyword(body: &str, needle: &str) -> bool {
    body.to_lowercase().contains(needle)
}

/// Every usable href of an anchor tag in `html`.
pub fn extract_links(html: &str) -> HashSet<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return HashSet::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !is_ignored_href(href))
        .map(str::to_string)
        .collect()
}
