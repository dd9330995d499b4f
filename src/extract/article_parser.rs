//! Newspaper-style article parsing.
//!
//! Looks for the usual article containers (`articleBody` microdata,
//! `<article>`, common CMS body classes, `<main>`) and joins the paragraphs
//! of the richest one. Paragraphs inside asides, navigation, footers and
//! captions are skipped. Headline, byline and publish date are read too and
//! travel with the text as [`PageMetadata`].

use super::{Attempt, ExtractionStrategy, PageFetcher};
use crate::error::StrategyError;
use crate::models::{PageMetadata, StrategyKind};
use crate::utils::clean_text;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[itemprop="articleBody"]"#,
        "article",
        ".article-body, .article__body, .article-content, .story-body, .post-content, .entry-content",
        r#"[role="main"]"#,
        "main",
        "body",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static AUTHOR_META: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="author"]"#).unwrap());
static BYLINE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[rel="author"], [itemprop="author"], .byline, .author"#).unwrap()
});
static PUBLISHED: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[property="article:published_time"], meta[itemprop="datePublished"], time[datetime]"#,
    )
    .unwrap()
});
static RE_BY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^by\s+").unwrap());
static RE_NAME_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*(?:,|&|\band\b)\s*").unwrap());

const SKIPPED_ANCESTORS: [&str; 5] = ["aside", "nav", "footer", "figcaption", "form"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArticle {
    pub metadata: PageMetadata,
    pub text: String,
}

fn in_boilerplate(p: &ElementRef) -> bool {
    p.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| SKIPPED_ANCESTORS.contains(&el.name()))
    })
}

fn paragraphs(container: ElementRef) -> Vec<String> {
    container
        .select(&PARAGRAPH)
        .filter(|p| !in_boilerplate(p))
        .map(|p| clean_text(&p.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| match el.value().attr("content") {
            Some(content) => clean_text(content),
            None => clean_text(&el.text().collect::<String>()),
        })
        .find(|t| !t.is_empty())
}

/// Split a byline like "By Dana Reyes and Sam Ortiz" into names.
fn byline_names(byline: &str) -> Vec<String> {
    let byline = RE_BY_PREFIX.replace(byline.trim(), "");
    RE_NAME_SEP
        .split(&byline)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn authors(document: &Html) -> Vec<String> {
    let meta: Vec<String> = document
        .select(&AUTHOR_META)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .collect();
    let bylines = if meta.is_empty() {
        first_text(document, &BYLINE).into_iter().collect()
    } else {
        meta
    };
    bylines.iter().flat_map(|b| byline_names(b)).unique().collect()
}

fn published_at(document: &Html) -> Option<DateTime<Utc>> {
    document
        .select(&PUBLISHED)
        .filter_map(|el| el.value().attr("content").or_else(|| el.value().attr("datetime")))
        .find_map(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn metadata_of(document: &Html) -> PageMetadata {
    PageMetadata {
        headline: first_text(document, &OG_TITLE).or_else(|| first_text(document, &H1)),
        authors: authors(document),
        published_at: published_at(document),
    }
}

/// Headline, authors and publish date declared by a page.
pub fn page_metadata(html: &str) -> PageMetadata {
    metadata_of(&Html::parse_document(html))
}

pub fn parse_article(html: &str) -> ParsedArticle {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for selector in CONTAINERS.iter() {
        let best = document
            .select(selector)
            .map(paragraphs)
            .max_by_key(|ps| ps.iter().map(|p| p.chars().count()).sum::<usize>());
        if let Some(ps) = best.filter(|ps| !ps.is_empty()) {
            text = ps.join("\n\n");
            break;
        }
    }

    ParsedArticle {
        metadata: metadata_of(&document),
        text,
    }
}

pub struct ArticleParserStrategy {
    fetcher: PageFetcher,
}

impl ArticleParserStrategy {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ExtractionStrategy for ArticleParserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ArticleParser
    }

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError> {
        let html = self.fetcher.fetch_html(url).await?;
        let parsed = parse_article(&html);
        debug!(
            %url,
            headline = parsed.metadata.headline.as_deref().unwrap_or("-"),
            authors = %parsed.metadata.authors.iter().join(", "),
            "parsed article"
        );
        Ok(Attempt::Article {
            text: parsed.text,
            metadata: parsed.metadata,
        })
    }
}
