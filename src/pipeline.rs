//! Query to articles: feed search, link decoding, content extraction.
//!
//! # Flow
//!
//! 1. [`FeedSearcher::search`] returns entries in feed order; the list is cut
//!    to `max_articles` before any per-entry work so no surplus decode call
//!    is ever made.
//! 2. Each entry's link goes through the [`UrlResolver`]. An unresolved link
//!    is kept as the article URL and logged.
//! 3. The [`ContentExtractor`] runs on that URL. When every strategy fails
//!    the article keeps an empty `content`.
//!
//! Only the feed step can fail the run. Entries are processed through a
//! `buffered` stream, so results keep feed order for any concurrency.

use crate::config::Config;
use crate::decoder::{GoogleNewsDecoder, UrlResolver};
use crate::error::{FetchError, PipelineError};
use crate::extract::headless::default_renderer;
use crate::extract::{ContentExtractor, PageFetcher};
use crate::feed::{FeedSearcher, GoogleNewsFeed};
use crate::http::{HttpClient, ReqwestClient};
use crate::models::{Article, ExtractionResult, ResolvedUrl, SearchResult};
use crate::rate_limiter::{HostRateLimiters, RateLimiter};
use crate::retry::Backoff;
use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub struct ArticleResolutionPipeline {
    feed: Arc<dyn FeedSearcher>,
    resolver: Arc<dyn UrlResolver>,
    extractor: Arc<ContentExtractor>,
    extract_concurrency: usize,
}

impl ArticleResolutionPipeline {
    pub fn new(
        feed: Arc<dyn FeedSearcher>,
        resolver: Arc<dyn UrlResolver>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            feed,
            resolver,
            extractor: Arc::new(extractor),
            extract_concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.extract_concurrency = n.max(1);
        self
    }

    /// Wire the production components.
    ///
    /// The feed and the decoder share one aggregator limiter; publisher
    /// fetches are spaced per host.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let http: Arc<dyn HttpClient> =
            Arc::new(ReqwestClient::new(&config.user_agent, config.http_timeout())?);
        let aggregator = Arc::new(RateLimiter::new(config.aggregator.min_interval()));

        let feed = GoogleNewsFeed::new(Arc::clone(&http), Arc::clone(&aggregator))
            .with_base_url(&config.feed.base_url)
            .with_locale(&config.region, &config.language)
            .with_backoff(Backoff::new(config.feed.max_retries, config.feed.base_delay()));
        let decoder = GoogleNewsDecoder::new(Arc::clone(&http), aggregator)
            .with_locale(&config.region, &config.language)
            .with_post_decode_interval(config.aggregator.post_decode_interval());

        let publishers = Arc::new(HostRateLimiters::new(config.publisher.min_interval()));
        let extractor = ContentExtractor::from_config(
            &config.extraction,
            PageFetcher::new(http, publishers),
            default_renderer(),
        );

        Ok(Self::new(Arc::new(feed), Arc::new(decoder), extractor)
            .with_concurrency(config.pipeline.extract_concurrency))
    }

    /// Resolve up to `max_articles` articles for `query`, in feed order.
    ///
    /// # Arguments
    /// * `query` - Free-text search query.
    /// * `max_articles` - Cap on the number of feed entries processed.
    /// * `cancel` - Checked before each entry starts; entries already
    ///   finished are returned.
    ///
    /// # Returns
    /// One [`Article`] per processed entry. Decode and extraction failures
    /// degrade the article (raw link, empty content) instead of dropping it.
    ///
    /// # Errors
    /// [`PipelineError::Feed`] when the search itself fails.
    #[instrument(level = "info", skip(self, cancel))]
    pub async fn resolve(
        &self,
        query: &str,
        max_articles: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Article>, PipelineError> {
        let mut entries = self.feed.search(query).await?;
        let found = entries.len();
        entries.truncate(max_articles);
        let total = entries.len();
        info!(found, processing = total, "resolving feed entries");

        let articles: Vec<Article> = stream::iter(entries.into_iter().enumerate())
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|(index, entry)| self.resolve_entry(index, entry))
            .buffered(self.extract_concurrency)
            .collect()
            .await;

        if articles.len() < total {
            warn!(done = articles.len(), total, "resolution cancelled");
        }
        let with_content = articles.iter().filter(|a| !a.content.is_empty()).count();
        info!(articles = articles.len(), with_content, "resolution complete");
        Ok(articles)
    }

    async fn resolve_entry(&self, index: usize, entry: SearchResult) -> Article {
        let url = match self.resolver.resolve(&entry.obfuscated_url).await {
            ResolvedUrl::Resolved { url } => url,
            ResolvedUrl::Unresolved { reason } => {
                warn!(
                    index,
                    link = %entry.obfuscated_url,
                    error = %reason,
                    "keeping undecoded aggregator link"
                );
                entry.obfuscated_url.clone()
            }
        };

        let extraction = self.extractor.extract(&url).await;
        match &extraction {
            ExtractionResult::Extracted {
                text,
                strategy_used,
                ..
            } => {
                info!(index, %url, strategy = %strategy_used, chars = text.chars().count(), "article ready");
            }
            ExtractionResult::Failed { attempts } => {
                warn!(index, %url, attempts = attempts.len(), "no content extracted; keeping metadata only");
            }
        }
        Article::from_parts(entry, url, extraction)
    }
}
