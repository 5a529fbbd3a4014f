use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Policy-relevant page kinds the collector probes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Home,
    PrivacyPolicy,
    Terms,
    CookiePolicy,
}

impl PageKind {
    pub const fn label(self) -> &'static str {
        match self {
            PageKind::Home => "home",
            PageKind::PrivacyPolicy => "privacy_policy",
            PageKind::Terms => "terms",
            PageKind::CookiePolicy => "cookie_policy",
        }
    }
}

/// Candidate paths in probe order. Later candidates for an already-found kind
/// are skipped, so the effective budget is one fetch per missing kind.
const CANDIDATE_PAGES: &[(PageKind, &str)] = &[
    (PageKind::Home, "/"),
    (PageKind::PrivacyPolicy, "/privacy"),
    (PageKind::PrivacyPolicy, "/privacy-policy"),
    (PageKind::Terms, "/terms"),
    (PageKind::CookiePolicy, "/cookie-policy"),
];

/// Raw fetch result handed back by a [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Transport-level fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Text-fetch collaborator port. The production adapter wraps reqwest; tests
/// and the demo use canned fetchers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url).await
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build http client: {0}")]
pub struct HttpClientError(#[from] reqwest::Error);

/// reqwest-backed fetcher with a per-request timeout.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, HttpClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("complyscan/0.1 (+compliance scan)")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .map_err(|err| FetchError::Transport(err.to_string()))?;
                Ok(FetchedPage { status, body })
            }
            Err(err) if err.is_timeout() => Err(FetchError::Timeout),
            Err(err) => Err(FetchError::Transport(err.to_string())),
        }
    }
}

/// Retry and budget knobs for page collection.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub page_budget: usize,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_budget: 5,
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Extracted text for one retrieved page.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedPage {
    pub kind: PageKind,
    pub url: String,
    pub text: String,
}

/// Per-domain collection result plus metadata. Partial success (fewer kinds
/// than probed) is valid and only degrades analysis coverage.
#[derive(Debug, Clone, Serialize)]
pub struct PageBundle {
    pub domain: String,
    pub pages: Vec<CollectedPage>,
    pub total_bytes: usize,
    pub duration_ms: u64,
}

impl PageBundle {
    pub fn has_page(&self, kind: PageKind) -> bool {
        self.pages.iter().any(|page| page.kind == kind)
    }

    /// All visible text across retrieved pages, lower-cased for matching.
    pub fn corpus(&self) -> String {
        let mut corpus = String::new();
        for page in &self.pages {
            if !corpus.is_empty() {
                corpus.push(' ');
            }
            corpus.push_str(&page.text.to_lowercase());
        }
        corpus
    }
}

/// Terminal collection failure: not a single candidate page was retrievable.
#[derive(Debug, thiserror::Error)]
#[error("no pages retrievable from {domain}")]
pub struct CollectionFailed {
    pub domain: String,
}

/// Fetches a bounded set of pages from a target domain and extracts their
/// visible text.
pub struct SiteCollector<F> {
    fetcher: F,
    config: CollectorConfig,
}

impl<F: PageFetcher> SiteCollector<F> {
    pub fn new(fetcher: F, config: CollectorConfig) -> Self {
        Self { fetcher, config }
    }

    /// Probe the candidate paths, reporting `(fetched, budget)` after each
    /// attempt so callers can surface incremental progress.
    pub async fn collect<P>(
        &self,
        domain: &str,
        mut on_page: P,
    ) -> Result<PageBundle, CollectionFailed>
    where
        P: FnMut(usize, usize) + Send,
    {
        let started = Instant::now();
        let candidates: Vec<&(PageKind, &str)> = CANDIDATE_PAGES
            .iter()
            .take(self.config.page_budget)
            .collect();
        let budget = candidates.len();

        let mut pages: Vec<CollectedPage> = Vec::new();
        let mut total_bytes = 0usize;

        for (index, (kind, path)) in candidates.into_iter().enumerate() {
            if pages.iter().any(|page| page.kind == *kind) {
                on_page(index + 1, budget);
                continue;
            }

            let url = format!("https://{domain}{path}");
            match self.fetch_with_retry(&url).await {
                Ok(page) if (200..300).contains(&page.status) => {
                    total_bytes += page.body.len();
                    pages.push(CollectedPage {
                        kind: *kind,
                        url,
                        text: visible_text(&page.body),
                    });
                }
                Ok(page) => {
                    debug!(%url, status = page.status, "candidate page not available");
                }
                Err(err) => {
                    warn!(%url, error = %err, "abandoning page after retries");
                }
            }
            on_page(index + 1, budget);
        }

        if pages.is_empty() {
            return Err(CollectionFailed {
                domain: domain.to_string(),
            });
        }

        Ok(PageBundle {
            domain: domain.to_string(),
            pages,
            total_bytes,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Retries timeouts, transport errors, and 5xx with doubling backoff.
    /// 4xx responses are authoritative and never retried.
    async fn fetch_with_retry(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0u32;
        let mut delay = self.config.backoff_base;

        loop {
            match self.fetcher.fetch(url).await {
                Ok(page) if page.status >= 500 && attempt < self.config.max_retries => {
                    debug!(%url, status = page.status, attempt, "retrying after server error");
                }
                Ok(page) => return Ok(page),
                Err(err) if attempt < self.config.max_retries => {
                    debug!(%url, error = %err, attempt, "retrying after fetch error");
                }
                Err(err) => return Err(err),
            }

            sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
        }
    }
}

/// Strip markup and script/style content, collapsing whitespace between text
/// nodes to single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    push_visible_text(document.root_element(), &mut out);
    out
}

fn push_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if matches!(el.value().name(), "script" | "style" | "noscript" | "template") {
                continue;
            }
            push_visible_text(el, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
    }
}
