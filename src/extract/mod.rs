//! Tiered article-text extraction.
//!
//! A [`ContentExtractor`] holds an ordered list of [`ExtractionStrategy`]
//! implementations and runs them one after another until one produces text
//! of at least `min_content_length` characters. Sub-threshold text counts as
//! a failed attempt: many publishers answer bots with short placeholder or
//! error pages that would otherwise pass for an article.
//!
//! # Strategies
//!
//! | Kind | Module | Method |
//! |------|--------|--------|
//! | `readability` | [`readability`] | Boilerplate stripping on the downloaded page |
//! | `consent_unwrap` | [`consent`] | Follow a consent wall's `continue` target |
//! | `article_parser` | [`article_parser`] | DOM heuristics over article containers |
//! | `headless_render` | [`headless`] | Render in a browser, then extract |
//! | `raw_html` | [`raw_html`] | Strip every tag from the raw HTML |
//!
//! Strategy failures are logged and recorded, never propagated. When every
//! strategy fails the result is [`ExtractionResult::Failed`] with one entry
//! per attempt, in order.

pub mod article_parser;
pub mod consent;
pub mod headless;
pub mod raw_html;
pub mod readability;

use crate::config::ExtractionConfig;
use crate::error::{FetchError, StrategyError};
use crate::http::HttpClient;
use crate::models::{ExtractionResult, PageMetadata, StrategyFailure, StrategyKind};
use crate::rate_limiter::HostRateLimiters;
use crate::utils::{char_len, truncate_for_log};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How many consent-wall redirects one extraction may follow.
pub const MAX_REDIRECT_DEPTH: usize = 2;

/// What a strategy produced for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Candidate article text; the driver checks its length.
    Text(String),
    /// Candidate text plus what the page said about itself.
    Article { text: String, metadata: PageMetadata },
    /// Run the whole strategy list on this URL instead.
    Redirect(String),
}

/// One way of getting article text out of a URL.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError>;
}

/// Publisher page downloads, spaced per host.
#[derive(Clone)]
pub struct PageFetcher {
    http: Arc<dyn HttpClient>,
    limiters: Arc<HostRateLimiters>,
}

impl PageFetcher {
    pub fn new(http: Arc<dyn HttpClient>, limiters: Arc<HostRateLimiters>) -> Self {
        Self { http, limiters }
    }

    pub fn limiters(&self) -> Arc<HostRateLimiters> {
        Arc::clone(&self.limiters)
    }

    /// Download a page body after waiting on its host's limiter.
    ///
    /// # Arguments
    /// * `url` - Absolute page URL.
    ///
    /// # Returns
    /// The body of a 2xx response.
    ///
    /// # Errors
    /// [`FetchError::Status`] for a non-2xx status, or the transport's error.
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.limiters.for_url(url).acquire().await;
        let resp = self.http.get(url).await?.error_for_status()?;
        debug!(%url, bytes = resp.body.len(), "fetched page");
        Ok(resp.body)
    }
}

pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_content_length: usize,
}

impl ContentExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>, min_content_length: usize) -> Self {
        Self {
            strategies,
            min_content_length,
        }
    }

    /// Build the configured strategy list, dropping repeated kinds.
    pub fn from_config(
        config: &ExtractionConfig,
        fetcher: PageFetcher,
        renderer: Arc<dyn headless::PageRenderer>,
    ) -> Self {
        let strategies = config
            .strategies
            .iter()
            .copied()
            .unique()
            .map(|kind| -> Box<dyn ExtractionStrategy> {
                match kind {
                    StrategyKind::Readability => {
                        Box::new(readability::ReadabilityStrategy::new(fetcher.clone()))
                    }
                    StrategyKind::ConsentUnwrap => {
                        Box::new(consent::ConsentUnwrap::new(config.consent_hosts.clone()))
                    }
                    StrategyKind::ArticleParser => {
                        Box::new(article_parser::ArticleParserStrategy::new(fetcher.clone()))
                    }
                    StrategyKind::HeadlessRender => Box::new(headless::HeadlessRender::new(
                        Arc::clone(&renderer),
                        fetcher.limiters(),
                        config.browser_pool_size,
                        config.headless_timeout(),
                        config.min_content_length,
                    )),
                    StrategyKind::RawHtml => Box::new(raw_html::RawHtmlStrategy::new(fetcher.clone())),
                }
            })
            .collect::<Vec<_>>();

        info!(
            order = %strategies.iter().map(|s| s.kind()).join(" > "),
            min_content_length = config.min_content_length,
            "content extractor configured"
        );
        Self::new(strategies, config.min_content_length)
    }

    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn min_content_length(&self) -> usize {
        self.min_content_length
    }

    /// Try each strategy in order and return the first usable text.
    ///
    /// # Arguments
    /// * `url` - The page to extract; consent-wall targets are followed up
    ///   to [`MAX_REDIRECT_DEPTH`] levels deep.
    ///
    /// # Returns
    /// [`ExtractionResult::Extracted`] with text of at least
    /// `min_content_length` characters and any page metadata, or
    /// [`ExtractionResult::Failed`] listing every attempt. Never an error.
    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        self.extract_at(url.to_string(), 0).await
    }

    fn extract_at(&self, url: String, depth: usize) -> BoxFuture<'_, ExtractionResult> {
        async move {
            let mut attempts = Vec::with_capacity(self.strategies.len());
            let mut fail = |strategy: StrategyKind, reason: String| {
                attempts.push(StrategyFailure { strategy, reason });
            };

            for strategy in &self.strategies {
                let kind = strategy.kind();
                let (text, metadata) = match strategy.attempt(&url).await {
                    Ok(Attempt::Text(text)) => (text, PageMetadata::default()),
                    Ok(Attempt::Article { text, metadata }) => (text, metadata),
                    Ok(Attempt::Redirect(target)) if depth >= MAX_REDIRECT_DEPTH => {
                        warn!(%url, %target, strategy = %kind, "redirect depth exhausted");
                        fail(kind, format!("redirect depth {MAX_REDIRECT_DEPTH} exhausted at {target}"));
                        continue;
                    }
                    Ok(Attempt::Redirect(target)) => {
                        info!(%url, %target, strategy = %kind, "following redirect target");
                        match self.extract_at(target.clone(), depth + 1).await {
                            found @ ExtractionResult::Extracted { .. } => return found,
                            ExtractionResult::Failed { attempts: nested } => {
                                fail(
                                    kind,
                                    format!(
                                        "redirect target {target} yielded no content ({} strategies failed)",
                                        nested.len()
                                    ),
                                );
                            }
                        }
                        continue;
                    }
                    Err(StrategyError::NotApplicable) => {
                        debug!(%url, strategy = %kind, "strategy not applicable");
                        fail(kind, StrategyError::NotApplicable.to_string());
                        continue;
                    }
                    Err(e) => {
                        warn!(%url, strategy = %kind, error = %e, "extraction strategy failed");
                        fail(kind, e.to_string());
                        continue;
                    }
                };

                let len = char_len(&text);
                if len >= self.min_content_length {
                    info!(
                        %url,
                        strategy = %kind,
                        chars = len,
                        authors = metadata.authors.len(),
                        "extracted article text"
                    );
                    return ExtractionResult::Extracted {
                        text: text.trim().to_string(),
                        strategy_used: kind,
                        metadata,
                    };
                }
                let e = StrategyError::TooShort {
                    len,
                    min: self.min_content_length,
                };
                warn!(
                    %url,
                    strategy = %kind,
                    error = %e,
                    preview = %truncate_for_log(&text, 80),
                    "strategy yielded too little text"
                );
                fail(kind, e.to_string());
            }

            warn!(%url, attempts = attempts.len(), "all extraction strategies exhausted");
            ExtractionResult::Failed { attempts }
        }
        .boxed()
    }
}
