use std::time::Duration;

use keyword_crawler::crawler::{CrawlerConfig, JobStatus, JobView, Origin};
use keyword_crawler::{CompletionEvents, CrawlError, JobRegistry};
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn registry_for(server: &MockServer) -> (JobRegistry, CompletionEvents) {
    let origin = Origin::parse(&server.uri()).unwrap();
    let config = CrawlerConfig::new(origin)
        .with_connect_timeout(Duration::from_secs(2))
        .with_read_timeout(Duration::from_secs(2));
    JobRegistry::new(config, Duration::from_secs(60)).unwrap()
}

async fn wait_until_done(registry: &JobRegistry, id: &str) -> JobView {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let view = registry.get_state(id).unwrap();
            if view.status == JobStatus::Done {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("crawl did not finish")
}

async fn mount_site(server: &MockServer) {
    Mock::given(path("/"))
        .respond_with(html(
            r#"<html><body>
                <h1>Welcome to the Rust corner</h1>
                <a href="/guide">Guide</a>
                <a href='/blog'>Blog</a>
                <a href="https://other.example/rust">Elsewhere</a>
                <a href="mailto:rust@example.com">Mail</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(path("/guide"))
        .respond_with(html(
            r#"<p>The RUST guide</p><a href="/">Home</a><a href="/guide#install">Install</a>"#,
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(path("/blog"))
        .respond_with(html(r#"<p>Nothing relevant</p><a href="/blog/post?id=1">Post</a>"#))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(path("/blog/post"))
        .respond_with(html("<p>Why we like rust</p>"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_job_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let (registry, mut events) = registry_for(&server);

    let id = registry.start("  rust ")?;
    assert_eq!(id.len(), 8);

    let view = wait_until_done(&registry, &id).await;
    let base = server.uri();
    assert_eq!(view.keyword, "rust");
    assert_eq!(
        view.urls,
        vec![
            format!("{}/", base),
            format!("{}/blog/post?id=1", base),
            format!("{}/guide", base),
        ]
    );
    assert_eq!(view.pages_visited, 4);

    let event = events.recv().await.unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.view, view);

    // Reads of a finished job are stable
    assert_eq!(registry.get_state(&id)?, registry.get_state(&id)?);
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_start_returns_before_crawl_finishes() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(html("<p>slow rust</p>").set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let (registry, mut events) = registry_for(&server);

    let id = registry.start("rust")?;
    let view = registry.get_state(&id)?;
    assert_eq!(view.status, JobStatus::Active);
    assert!(view.urls.is_empty());
    assert_eq!(registry.active_jobs(), 1);

    let event = events.recv().await.unwrap();
    assert_eq!(event.view.urls.len(), 1);
    assert_eq!(registry.active_jobs(), 0);
    Ok(())
}

#[tokio::test]
async fn test_jobs_do_not_share_state() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(html(r#"<p>alpha</p><a href="/b">b</a>"#))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/b"))
        .respond_with(html("<p>bravo</p>"))
        .expect(2)
        .mount(&server)
        .await;
    let (registry, _events) = registry_for(&server);

    let alpha = registry.start("alpha")?;
    let bravo = registry.start("bravo")?;
    assert_ne!(alpha, bravo);

    let alpha = wait_until_done(&registry, &alpha).await;
    let bravo = wait_until_done(&registry, &bravo).await;
    assert_eq!(alpha.urls, vec![format!("{}/", server.uri())]);
    assert_eq!(bravo.urls, vec![format!("{}/b", server.uri())]);
    Ok(())
}

#[tokio::test]
async fn test_cancel_finishes_job() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(html("<p>rust</p>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let (registry, mut events) = registry_for(&server);

    let id = registry.start("rust")?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    registry.cancel(&id)?;

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await?
        .unwrap();
    assert_eq!(event.view.status, JobStatus::Done);
    assert!(event.view.urls.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejected_keywords() {
    let server = MockServer::start().await;
    let (registry, _events) = registry_for(&server);

    assert!(matches!(registry.start(""), Err(CrawlError::InvalidKeyword { .. })));
    assert!(matches!(registry.start("abc"), Err(CrawlError::InvalidKeyword { .. })));
    assert!(matches!(
        registry.start(&"k".repeat(33)),
        Err(CrawlError::InvalidKeyword { .. })
    ));
    assert!(registry.is_empty());
    assert!(matches!(registry.get_state("missing0"), Err(CrawlError::JobNotFound(_))));
}
