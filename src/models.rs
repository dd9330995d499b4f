//! Data models for search results, resolution outcomes and articles.
//!
//! This module defines the records that flow through the pipeline:
//! - [`SearchResult`]: one raw entry from the search feed
//! - [`ResolvedUrl`]: outcome of decoding an obfuscated aggregator link
//! - [`ExtractionResult`]: outcome of the tiered content extractor
//! - [`Article`]: the normalized record handed to downstream consumers
//!
//! [`DecodingParams`] is transient and only lives inside one decode call.

use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry returned by the search feed.
///
/// Created once per feed item and consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Headline, cleaned of markup and entities.
    pub title: String,
    /// The aggregator's redirect link. Opaque until decoded.
    pub obfuscated_url: String,
    /// Publisher name, when the feed carries one.
    pub source: Option<String>,
    /// Publication time, when the feed carries a parseable one.
    pub published_at: Option<DateTime<Utc>>,
    /// Short description from the feed, cleaned of markup.
    pub summary: Option<String>,
}

/// Outcome of decoding an obfuscated link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedUrl {
    /// The canonical publisher URL. Always absolute http(s).
    Resolved { url: String },
    /// Decoding failed at the step named by `reason`.
    Unresolved { reason: DecodeError },
}

impl ResolvedUrl {
    pub fn url(&self) -> Option<&str> {
        match self {
            ResolvedUrl::Resolved { url } => Some(url),
            ResolvedUrl::Unresolved { .. } => None,
        }
    }

    /// The resolved URL, or `fallback` when decoding failed.
    pub fn into_url_or(self, fallback: &str) -> String {
        match self {
            ResolvedUrl::Resolved { url } => url,
            ResolvedUrl::Unresolved { .. } => fallback.to_string(),
        }
    }
}

/// Parameters scraped from the aggregator page and fed to the signed
/// decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingParams {
    pub signature: String,
    pub timestamp: String,
    pub token: String,
}

/// The extraction strategies, named as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Readability-style boilerplate stripping on the downloaded page.
    Readability,
    /// Unwrap a consent-wall URL and extract its real target.
    ConsentUnwrap,
    /// DOM heuristics over article containers and metadata.
    ArticleParser,
    /// Render in a headless browser, then extract.
    HeadlessRender,
    /// Strip every tag from the raw HTML.
    RawHtml,
}

impl StrategyKind {
    /// The default priority order.
    pub const DEFAULT_ORDER: [StrategyKind; 5] = [
        StrategyKind::Readability,
        StrategyKind::ConsentUnwrap,
        StrategyKind::ArticleParser,
        StrategyKind::HeadlessRender,
        StrategyKind::RawHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Readability => "readability",
            StrategyKind::ConsentUnwrap => "consent_unwrap",
            StrategyKind::ArticleParser => "article_parser",
            StrategyKind::HeadlessRender => "headless_render",
            StrategyKind::RawHtml => "raw_html",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page-level facts a strategy recovered alongside the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// The page's own headline (`og:title` or first `<h1>`).
    pub headline: Option<String>,
    /// Author names from the byline, in page order, without duplicates.
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A strategy that was tried and did not produce usable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: StrategyKind,
    pub reason: String,
}

/// Outcome of the content extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// `text` is at least the configured minimum length.
    Extracted {
        text: String,
        strategy_used: StrategyKind,
        metadata: PageMetadata,
    },
    /// Every strategy failed; `attempts` is in the order they were tried.
    Failed { attempts: Vec<StrategyFailure> },
}

impl ExtractionResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Extracted { text, .. } => Some(text),
            ExtractionResult::Failed { .. } => None,
        }
    }

    pub fn strategy_used(&self) -> Option<StrategyKind> {
        match self {
            ExtractionResult::Extracted { strategy_used, .. } => Some(*strategy_used),
            ExtractionResult::Failed { .. } => None,
        }
    }
}

/// The normalized output record.
///
/// Constructed once per [`SearchResult`] at the end of the pipeline and
/// handed to the caller. `content` is always present; it is empty when
/// every extraction strategy failed. Page metadata fills `headline` and
/// `authors`, and `published_at` when the feed had no date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// Best available URL: the decoded one, or the raw feed link.
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: String,
    /// Headline as printed on the publisher page.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<String>,
    /// Strategy that produced `content`, if any did.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extracted_with: Option<StrategyKind>,
}

impl Article {
    pub fn from_parts(entry: SearchResult, url: String, extraction: ExtractionResult) -> Self {
        let (content, extracted_with, metadata) = match extraction {
            ExtractionResult::Extracted {
                text,
                strategy_used,
                metadata,
            } => (text, Some(strategy_used), metadata),
            ExtractionResult::Failed { .. } => (String::new(), None, PageMetadata::default()),
        };
        Article {
            title: entry.title,
            url,
            source: entry.source,
            published_at: entry.published_at.or(metadata.published_at),
            summary: entry.summary,
            content,
            headline: metadata.headline,
            authors: metadata.authors,
            extracted_with,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SearchResult {
        SearchResult {
            title: "Reactor restart approved".into(),
            obfuscated_url: "https://news.google.com/rss/articles/CBMiabc".into(),
            source: Some("Example Times".into()),
            published_at: None,
            summary: None,
        }
    }

    #[test]
    fn test_failed_extraction_yields_empty_content() {
        let article = Article::from_parts(
            entry(),
            "https://news.google.com/rss/articles/CBMiabc".into(),
            ExtractionResult::Failed { attempts: vec![] },
        );
        assert_eq!(article.content, "");
        assert_eq!(article.extracted_with, None);
        assert_eq!(article.source.as_deref(), Some("Example Times"));
    }

    #[test]
    fn test_article_serializes_content_even_when_empty() {
        let article = Article::from_parts(
            entry(),
            "https://example.com/a".into(),
            ExtractionResult::Failed { attempts: vec![] },
        );
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["content"], "");
        assert_eq!(json["url"], "https://example.com/a");
        assert!(json.get("extracted_with").is_none());
        assert!(json.get("authors").is_none());
    }

    #[test]
    fn test_page_metadata_carried_into_article() {
        let page_date = DateTime::parse_from_rfc3339("2024-10-13T18:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let article = Article::from_parts(
            entry(),
            "https://example.com/a".into(),
            ExtractionResult::Extracted {
                text: "Body".into(),
                strategy_used: StrategyKind::ArticleParser,
                metadata: PageMetadata {
                    headline: Some("Reactor restart approved by regulator".into()),
                    authors: vec!["Dana Reyes".into(), "Sam Ortiz".into()],
                    published_at: Some(page_date),
                },
            },
        );
        assert_eq!(article.authors, vec!["Dana Reyes", "Sam Ortiz"]);
        assert_eq!(article.headline.as_deref(), Some("Reactor restart approved by regulator"));
        assert_eq!(article.published_at, Some(page_date));

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["authors"][1], "Sam Ortiz");
        assert_eq!(json["extracted_with"], "article_parser");
    }

    #[test]
    fn test_feed_date_wins_over_page_date() {
        let feed_date = DateTime::parse_from_rfc3339("2024-10-14T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut e = entry();
        e.published_at = Some(feed_date);
        let article = Article::from_parts(
            e,
            "https://example.com/a".into(),
            ExtractionResult::Extracted {
                text: "Body".into(),
                strategy_used: StrategyKind::Readability,
                metadata: PageMetadata {
                    published_at: Some(feed_date - chrono::Duration::days(1)),
                    ..PageMetadata::default()
                },
            },
        );
        assert_eq!(article.published_at, Some(feed_date));
        assert!(article.authors.is_empty());
    }

    #[test]
    fn test_strategy_kind_config_names() {
        let kinds: Vec<StrategyKind> =
            serde_yaml::from_str("[readability, consent_unwrap, headless_render, raw_html]")
                .unwrap();
        assert_eq!(kinds[2], StrategyKind::HeadlessRender);
        assert_eq!(StrategyKind::ArticleParser.to_string(), "article_parser");
    }

    #[test]
    fn test_unresolved_falls_back() {
        let r = ResolvedUrl::Unresolved {
            reason: DecodeError::InvalidUrlFormat("x".into()),
        };
        assert_eq!(r.url(), None);
        assert_eq!(r.into_url_or("https://raw"), "https://raw");
    }
}
