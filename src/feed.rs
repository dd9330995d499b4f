//! Google News RSS search.
//!
//! The search endpoint returns an RSS 2.0 channel whose items link to the
//! aggregator's obfuscated redirect pages. The document is walked with
//! `quick-xml`'s event reader and every item is deserialized on its own with
//! its serde support; an item that does not parse, or has no title or link,
//! is skipped rather than failing the whole feed.
//!
//! # URL Pattern
//!
//! ```text
//! https://news.google.com/rss/search?q=<query>&hl=<lang>&gl=<REGION>&ceid=<REGION>:<lang>
//! ```

use crate::error::FeedError;
use crate::http::HttpClient;
use crate::models::SearchResult;
use crate::rate_limiter::RateLimiter;
use crate::retry::Backoff;
use crate::utils::{clean_text, strip_markup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search";

#[async_trait]
pub trait FeedSearcher: Send + Sync {
    /// Entries matching `query`, in feed order.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(rename = "$text")]
    name: Option<String>,
}

fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Slice the raw `<item>...</item>` elements out of a feed document.
///
/// Fails only when the document itself is not well-formed XML or has no
/// `<channel>`; the contents of each item are left for the caller.
fn item_elements(xml: &str) -> Result<Vec<&str>, FeedError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut saw_channel = false;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"channel" => saw_channel = true,
                b"item" => {
                    reader
                        .read_to_end(e.name())
                        .map_err(|err| FeedError::Parse(format!("unterminated <item>: {err}")))?;
                    let end = reader.buffer_position() as usize;
                    let raw = xml
                        .get(start..end)
                        .ok_or_else(|| FeedError::Parse(format!("bad item span {start}..{end}")))?;
                    items.push(raw);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"item" => {
                warn!(offset = start, "skipping empty feed item");
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(FeedError::Parse(format!(
                    "malformed XML near byte {start}: {err}"
                )));
            }
        }
    }

    if !saw_channel {
        return Err(FeedError::Parse("document has no RSS <channel>".to_string()));
    }
    Ok(items)
}

/// Parse a search feed body into entries.
///
/// Each `<item>` is deserialized on its own, so one malformed item is
/// logged and skipped instead of discarding the rest of the feed.
///
/// # Arguments
/// * `xml` - The RSS document as returned by the search endpoint.
///
/// # Returns
/// The usable entries in feed order. Items without a title or link are
/// dropped.
///
/// # Errors
/// [`FeedError::Parse`] when the document is not well-formed XML or has no
/// channel.
pub fn parse_feed(xml: &str) -> Result<Vec<SearchResult>, FeedError> {
    let elements = item_elements(xml)?;

    let mut out = Vec::with_capacity(elements.len());
    for (i, raw) in elements.into_iter().enumerate() {
        let item: Item = match from_str(raw) {
            Ok(item) => item,
            Err(e) => {
                warn!(index = i, error = %e, "skipping malformed feed item");
                continue;
            }
        };
        let (Some(title), Some(link)) = (item.title, item.link) else {
            warn!(index = i, "skipping feed item without title or link");
            continue;
        };
        let link = link.trim().to_string();
        if link.is_empty() {
            warn!(index = i, "skipping feed item with empty link");
            continue;
        }

        out.push(SearchResult {
            title: clean_text(&title),
            obfuscated_url: link,
            source: item
                .source
                .and_then(|s| s.name)
                .map(|s| clean_text(&s))
                .filter(|s| !s.is_empty()),
            published_at: item.pub_date.as_deref().and_then(parse_pub_date),
            summary: item
                .description
                .as_deref()
                .map(strip_markup)
                .filter(|s| !s.is_empty()),
        });
    }
    Ok(out)
}

pub struct GoogleNewsFeed {
    http: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    language: String,
    region: String,
    backoff: Backoff,
}

impl GoogleNewsFeed {
    pub fn new(http: Arc<dyn HttpClient>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http,
            limiter,
            base_url: GOOGLE_NEWS_SEARCH_URL.to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
            backoff: Backoff::none(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_locale(mut self, region: &str, language: &str) -> Self {
        self.region = region.to_string();
        self.language = language.to_string();
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&hl={}&gl={}&ceid={}:{}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.language),
            urlencoding::encode(&self.region),
            urlencoding::encode(&self.region),
            urlencoding::encode(&self.language),
        )
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<SearchResult>, FeedError> {
        self.limiter.acquire().await;
        let resp = self.http.get(url).await?.error_for_status()?;
        debug!(bytes = resp.body.len(), "feed body received");
        parse_feed(&resp.body)
    }
}

#[async_trait]
impl FeedSearcher for GoogleNewsFeed {
    #[instrument(level = "info", skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FeedError> {
        let url = self.search_url(query);
        let entries = self
            .backoff
            .run("feed search", || self.fetch_once(&url))
            .await?;
        info!(count = entries.len(), "feed search returned entries");
        Ok(entries)
    }
}
