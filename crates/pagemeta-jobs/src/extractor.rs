//! Page metadata extraction.
//!
//! Fetches a URL and pulls the title, description and keywords out of the
//! returned HTML. Fetch failures never surface as errors: the extractor
//! returns `None` and the batch runner skips the row.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use tracing::debug;

use pagemeta_core::{defaults, PageMetadata, Result};

/// Source of page metadata for a single URL.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Fetch `url` and extract its metadata, or `None` if the page could not
    /// be retrieved.
    async fn extract(&self, url: &str) -> Option<PageMetadata>;
}

/// Extractor backed by reqwest and scraper.
#[derive(Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl HttpExtractor {
    /// Build an extractor with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(defaults::FETCH_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Build an extractor with the default 10 second timeout.
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(Duration::from_secs(defaults::FETCH_TIMEOUT_SECS))
    }

    async fn fetch_html(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("HTTP {status}"));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read body: {e}"))
    }
}

#[async_trait]
impl MetadataExtractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Option<PageMetadata> {
        match self.fetch_html(url).await {
            Ok(html) => Some(parse_page(&html)),
            Err(reason) => {
                debug!(
                    subsystem = "jobs",
                    component = "extractor",
                    url,
                    reason = %reason,
                    "Skipping URL"
                );
                None
            }
        }
    }
}

/// Extract metadata from an HTML document.
///
/// Uses the first `<title>` element's text as-is, and the `content` attribute
/// of the first `<meta name="description">` and `<meta name="keywords">`
/// elements. Anything missing becomes an empty string.
pub fn parse_page(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    PageMetadata {
        title,
        description: meta_content(&document, "description"),
        keywords: meta_content(&document, "keywords"),
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn meta_content(document: &Html, name: &str) -> String {
    select_first(document, &format!(r#"meta[name="{name}"]"#))
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_page_all_fields() {
        let html = r#"<html><head>
            <title>Example Domain</title>
            <meta name="description" content="An example page">
            <meta name="keywords" content="example,domain">
        </head><body></body></html>"#;

        let meta = parse_page(html);
        assert_eq!(meta.title, "Example Domain");
        assert_eq!(meta.description, "An example page");
        assert_eq!(meta.keywords, "example,domain");
    }

    #[test]
    fn test_parse_page_missing_fields_default_to_empty() {
        let meta = parse_page("<html><head><title>Example</title></head></html>");
        assert_eq!(
            meta,
            PageMetadata {
                title: "Example".to_string(),
                description: String::new(),
                keywords: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_page_meta_without_content() {
        let meta = parse_page(r#"<head><meta name="description"></head>"#);
        assert_eq!(meta.description, "");
        assert_eq!(meta.title, "");
    }

    #[test]
    fn test_parse_page_uses_first_match() {
        let html = r#"<head>
            <title>First</title><title>Second</title>
            <meta name="keywords" content="one"><meta name="keywords" content="two">
        </head>"#;
        let meta = parse_page(html);
        assert_eq!(meta.title, "First");
        assert_eq!(meta.keywords, "one");
    }

    #[test]
    fn test_parse_page_title_is_not_trimmed() {
        let meta = parse_page("<title>  Spaced  </title>");
        assert_eq!(meta.title, "  Spaced  ");
    }

    #[tokio::test]
    async fn test_extract_ok_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<title>Example</title>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let extractor = HttpExtractor::with_default_timeout().unwrap();
        let meta = extractor
            .extract(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(meta.title, "Example");
    }

    #[tokio::test]
    async fn test_extract_non_200_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<title>Not Found</title>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/created"))
            .respond_with(ResponseTemplate::new(201).set_body_string("<title>Created</title>"))
            .mount(&server)
            .await;

        let extractor = HttpExtractor::with_default_timeout().unwrap();
        assert!(extractor
            .extract(&format!("{}/missing", server.uri()))
            .await
            .is_none());
        assert!(extractor
            .extract(&format!("{}/created", server.uri()))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_extract_timeout_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<title>Slow</title>")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let extractor = HttpExtractor::new(Duration::from_millis(50)).unwrap();
        assert!(extractor.extract(&server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_unreachable_returns_none() {
        let extractor = HttpExtractor::new(Duration::from_secs(1)).unwrap();
        assert!(extractor.extract("http://127.0.0.1:1/").await.is_none());
    }

    #[tokio::test]
    async fn test_extract_invalid_url_returns_none() {
        let extractor = HttpExtractor::with_default_timeout().unwrap();
        assert!(extractor.extract("not a url").await.is_none());
    }
}
