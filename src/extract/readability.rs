//! Boilerplate stripping with the `readability` crate.

use super::article_parser::page_metadata;
use super::{Attempt, ExtractionStrategy, PageFetcher};
use crate::error::StrategyError;
use crate::models::StrategyKind;
use crate::utils::normalize_paragraphs;
use async_trait::async_trait;
use std::io::Cursor;
use url::Url;

/// Main text of `html`, with navigation and chrome removed.
///
/// `url` resolves relative links inside the document.
pub fn readability_text(html: &str, url: &str) -> Result<String, StrategyError> {
    let base = Url::parse(url).map_err(|e| StrategyError::Parse(format!("{url}: {e}")))?;
    let mut reader = Cursor::new(html.as_bytes());
    let product = readability::extractor::extract(&mut reader, &base)
        .map_err(|e| StrategyError::Parse(e.to_string()))?;
    Ok(normalize_paragraphs(&product.text))
}

pub struct ReadabilityStrategy {
    fetcher: PageFetcher,
}

impl ReadabilityStrategy {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ExtractionStrategy for ReadabilityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Readability
    }

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError> {
        let html = self.fetcher.fetch_html(url).await?;
        let text = readability_text(&html, url)?;
        Ok(Attempt::Article {
            text,
            metadata: page_metadata(&html),
        })
    }
}
