use std::sync::OnceLock;
use std::time::Duration;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::utils::FetchError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
/// Bytes of a page read before scraping, the `<head>` sits well within it.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const ELLIPSIS: &str = "...";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
}

#[rocket::async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, FetchError>;
}

/// Fetches pages over HTTP(S) and scrapes their `<head>`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[rocket::async_trait]
impl MetadataFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<PageMetadata, FetchError> {
        let parsed = parse_http_url(url)?;

        let response = self
            .client
            .get(parsed.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.2",
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "unexpected response status");
            return Err(FetchError::Status(status.as_u16()));
        }

        // redirects may have moved us, relative links resolve against the final page
        let base = response.url().clone();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("html"))
            .unwrap_or(true);

        if !is_html {
            return Ok(PageMetadata {
                favicon: default_favicon(&base),
                ..Default::default()
            });
        }

        let body = read_head(response, MAX_BODY_BYTES).await?;
        Ok(parse_metadata(&body, &base))
    }
}

/// Reads at most `limit` bytes of the body and drops the rest of the response.
async fn read_head(mut response: reqwest::Response, limit: usize) -> Result<String, FetchError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            debug!(limit, "page body truncated");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

pub fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {scheme:?}"),
        }),
    }
}

pub(crate) fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static CSS selector is valid"))
}

fn meta_content(document: &Html, selectors: &[&Selector]) -> Option<String> {
    selectors.iter().find_map(|s| {
        document
            .select(s)
            .filter_map(|el| el.value().attr("content"))
            .find_map(clean_text)
    })
}

fn link_href(document: &Html, s: &Selector) -> Option<String> {
    document
        .select(s)
        .filter_map(|el| el.value().attr("href"))
        .find_map(clean_text)
}

pub(crate) fn clean_text(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(String::from)
}

fn default_favicon(base: &Url) -> Option<String> {
    resolve(base, "/favicon.ico")
}

/// Extracts page metadata, preferring OpenGraph, then Twitter cards, then plain HTML.
pub fn parse_metadata(html: &str, base: &Url) -> PageMetadata {
    static OG_TITLE: OnceLock<Selector> = OnceLock::new();
    static TWITTER_TITLE: OnceLock<Selector> = OnceLock::new();
    static TITLE: OnceLock<Selector> = OnceLock::new();
    static OG_DESCRIPTION: OnceLock<Selector> = OnceLock::new();
    static TWITTER_DESCRIPTION: OnceLock<Selector> = OnceLock::new();
    static DESCRIPTION: OnceLock<Selector> = OnceLock::new();
    static OG_IMAGE: OnceLock<Selector> = OnceLock::new();
    static TWITTER_IMAGE: OnceLock<Selector> = OnceLock::new();
    static ICON: OnceLock<Selector> = OnceLock::new();
    static APPLE_ICON: OnceLock<Selector> = OnceLock::new();

    let document = Html::parse_document(html);

    let title = meta_content(
        &document,
        &[
            selector(&OG_TITLE, r#"meta[property="og:title"]"#),
            selector(&TWITTER_TITLE, r#"meta[name="twitter:title"]"#),
        ],
    )
    .or_else(|| {
        document
            .select(selector(&TITLE, "title"))
            .find_map(|el| clean_text(&el.text().collect::<String>()))
    });

    let description = meta_content(
        &document,
        &[
            selector(&OG_DESCRIPTION, r#"meta[property="og:description"]"#),
            selector(&TWITTER_DESCRIPTION, r#"meta[name="twitter:description"]"#),
            selector(&DESCRIPTION, r#"meta[name="description"]"#),
        ],
    );

    let image = meta_content(
        &document,
        &[
            selector(&OG_IMAGE, r#"meta[property="og:image"]"#),
            selector(&TWITTER_IMAGE, r#"meta[name="twitter:image"]"#),
        ],
    )
    .and_then(|href| resolve(base, &href));

    let favicon = link_href(&document, selector(&ICON, r#"link[rel~="icon"]"#))
        .or_else(|| {
            link_href(
                &document,
                selector(&APPLE_ICON, r#"link[rel="apple-touch-icon"]"#),
            )
        })
        .and_then(|href| resolve(base, &href))
        .or_else(|| default_favicon(base));

    PageMetadata {
        title: title.map(|t| truncate(&t, TITLE_MAX_CHARS)),
        description: description.map(|d| truncate(&d, DESCRIPTION_MAX_CHARS)),
        image,
        favicon,
    }
}

/// Cuts `text` to at most `max` chars, ending in `...` when anything was dropped.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(ELLIPSIS.len())).collect();
    format!("{kept}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single request with `response`, then keeps the socket open for a while.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(&response).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        format!("http://{addr}/page")
    }

    fn http_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut rv = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        rv.extend_from_slice(body);
        rv
    }

    fn test_fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(timeout, "stashmark-test").unwrap()
    }

    fn base() -> Url {
        Url::parse("https://example.com/posts/rust").unwrap()
    }

    #[test]
    fn truncates_long_title() {
        let title = "a".repeat(105);
        let rv = truncate(&title, TITLE_MAX_CHARS);
        assert_eq!(rv.chars().count(), 100);
        assert!(rv.ends_with("..."));
        assert_eq!(&rv[..97], &title[..97]);
    }

    #[test]
    fn keeps_short_text() {
        assert_eq!(truncate("Rust", TITLE_MAX_CHARS), "Rust");
        let exact = "b".repeat(200);
        assert_eq!(truncate(&exact, DESCRIPTION_MAX_CHARS), exact);
    }

    #[test]
    fn truncates_by_chars_not_bytes() {
        let text = "é".repeat(250);
        let rv = truncate(&text, DESCRIPTION_MAX_CHARS);
        assert_eq!(rv.chars().count(), 200);
        assert!(rv.starts_with("éé"));
        assert!(rv.ends_with("..."));
    }

    #[test]
    fn prefers_open_graph() {
        let html = r#"
            <html><head>
                <title>Plain title</title>
                <meta property="og:title" content="  OG   title ">
                <meta name="description" content="plain description">
                <meta property="og:description" content="og description">
                <meta property="og:image" content="/img/cover.png">
                <link rel="shortcut icon" href="/static/icon.png">
            </head><body></body></html>
        "#;
        let m = parse_metadata(html, &base());
        assert_eq!(m.title.as_deref(), Some("OG title"));
        assert_eq!(m.description.as_deref(), Some("og description"));
        assert_eq!(
            m.image.as_deref(),
            Some("https://example.com/img/cover.png")
        );
        assert_eq!(
            m.favicon.as_deref(),
            Some("https://example.com/static/icon.png")
        );
    }

    #[test]
    fn falls_back_to_plain_html() {
        let html = r#"
            <html><head>
                <title>
                    The Rust
                    Book
                </title>
                <meta name="description" content="Learn Rust">
                <meta name="twitter:image" content="https://cdn.example.org/card.jpg">
                <link rel="apple-touch-icon" href="touch.png">
            </head></html>
        "#;
        let m = parse_metadata(html, &base());
        assert_eq!(m.title.as_deref(), Some("The Rust Book"));
        assert_eq!(m.description.as_deref(), Some("Learn Rust"));
        assert_eq!(m.image.as_deref(), Some("https://cdn.example.org/card.jpg"));
        assert_eq!(
            m.favicon.as_deref(),
            Some("https://example.com/posts/touch.png")
        );
    }

    #[test]
    fn empty_document() {
        let m = parse_metadata("<html><head><title>  </title></head></html>", &base());
        assert_eq!(m.title, None);
        assert_eq!(m.description, None);
        assert_eq!(m.image, None);
        assert_eq!(m.favicon.as_deref(), Some("https://example.com/favicon.ico"));
    }

    #[test]
    fn truncates_scraped_fields() {
        let html = format!(
            r#"<html><head><title>{}</title><meta name="description" content="{}"></head></html>"#,
            "t".repeat(150),
            "d".repeat(300)
        );
        let m = parse_metadata(&html, &base());
        assert_eq!(m.title.unwrap().chars().count(), TITLE_MAX_CHARS);
        assert_eq!(m.description.unwrap().chars().count(), DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(parse_http_url("https://example.com").is_ok());
        assert!(matches!(
            parse_http_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_http_url("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[rocket::async_test]
    async fn fetch_rejects_invalid_url_without_network() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1), "stashmark-test").unwrap();
        let rv = fetcher.fetch("javascript:alert(1)").await;
        assert!(matches!(rv, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn fetch_scrapes_html_page() {
        let body = br#"<html><head><title>Local page</title><link rel="icon" href="/i.png"></head></html>"#;
        let url = serve_once(http_response("200 OK", "text/html; charset=utf-8", body)).await;

        let m = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap();
        assert_eq!(m.title.as_deref(), Some("Local page"));
        assert!(m.favicon.unwrap().ends_with("/i.png"));
    }

    #[tokio::test]
    async fn fetch_fails_on_error_status() {
        let url = serve_once(http_response("404 Not Found", "text/html", b"gone")).await;

        let rv = test_fetcher(Duration::from_secs(5)).fetch(&url).await;
        assert!(matches!(rv, Err(FetchError::Status(404))), "{rv:?}");
    }

    #[tokio::test]
    async fn fetch_times_out_on_stalled_server() {
        // accepts the request but never answers
        let url = serve_once(Vec::new()).await;

        let rv = test_fetcher(Duration::from_millis(300)).fetch(&url).await;
        assert!(matches!(rv, Err(FetchError::Timeout)), "{rv:?}");
    }

    #[tokio::test]
    async fn non_html_gets_default_favicon_only() {
        let url = serve_once(http_response("200 OK", "application/pdf", b"%PDF-1.7")).await;

        let m = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap();
        let favicon = url.replace("/page", "/favicon.ico");
        assert_eq!(
            m,
            PageMetadata {
                favicon: Some(favicon),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn stops_reading_oversized_pages() {
        // announces far more than it sends, so a full read could only end in a timeout
        let head = b"<html><head><title>Huge page</title></head><body>";
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
            64 * 1024 * 1024
        )
        .into_bytes();
        response.extend_from_slice(head);
        response.extend_from_slice(&vec![b'a'; MAX_BODY_BYTES + 1024 * 1024]);
        let url = serve_once(response).await;

        let m = test_fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap();
        assert_eq!(m.title.as_deref(), Some("Huge page"));
    }
}
