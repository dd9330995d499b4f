//! Google News redirect decoding.
//!
//! The aggregator's search feed links to `news.google.com/rss/articles/<token>`
//! instead of the publisher. Recovering the publisher URL takes three
//! dependent calls, each in its own module:
//!
//! 1. [`token`]: check the link's shape and pull out the opaque token.
//! 2. [`params`]: fetch the article page and read the signature and
//!    timestamp it embeds.
//! 3. [`batch`]: send the signed batch-execute request and parse the
//!    destination out of the response.
//!
//! Every network call acquires the shared aggregator [`RateLimiter`].
//! Callers only see [`UrlResolver::resolve`], which never fails outright: a
//! failure comes back as [`ResolvedUrl::Unresolved`] naming the broken step.

pub mod batch;
pub mod params;
pub mod protocol;
pub mod token;

use crate::error::DecodeError;
use crate::http::HttpClient;
use crate::models::ResolvedUrl;
use crate::rate_limiter::RateLimiter;
use async_trait::async_trait;
use protocol::DecoderProtocol;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Turns an obfuscated aggregator link into the publisher URL.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, obfuscated_url: &str) -> ResolvedUrl;
}

pub struct GoogleNewsDecoder {
    http: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    protocol: DecoderProtocol,
    locale: String,
    post_decode_interval: Option<Duration>,
}

impl GoogleNewsDecoder {
    pub fn new(http: Arc<dyn HttpClient>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http,
            limiter,
            protocol: DecoderProtocol::default(),
            locale: "US:en".to_string(),
            post_decode_interval: None,
        }
    }

    pub fn with_protocol(mut self, protocol: DecoderProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Region and language sent in the decode request, e.g. `("US", "en")`.
    pub fn with_locale(mut self, region: &str, language: &str) -> Self {
        self.locale = format!("{region}:{language}");
        self
    }

    /// Sleep this long after a successful decode.
    ///
    /// Useful when the caller is about to hit the decoded publisher right away.
    pub fn with_post_decode_interval(mut self, interval: Option<Duration>) -> Self {
        self.post_decode_interval = interval;
        self
    }

    pub fn protocol(&self) -> &DecoderProtocol {
        &self.protocol
    }

    /// Run the three steps, surfacing the first failure.
    ///
    /// # Arguments
    /// * `obfuscated_url` - An aggregator link such as
    ///   `https://news.google.com/rss/articles/<token>?oc=5`.
    ///
    /// # Returns
    /// The absolute publisher URL. The post-decode interval, when set, is
    /// slept before returning and only after a success.
    ///
    /// # Errors
    /// The [`DecodeError`] of the step that failed.
    pub async fn decode(&self, obfuscated_url: &str) -> Result<String, DecodeError> {
        let token = token::extract_token(&self.protocol, obfuscated_url)?;
        let params =
            params::fetch_params(self.http.as_ref(), &self.limiter, &self.protocol, &token).await?;
        let url = batch::decode_call(
            self.http.as_ref(),
            &self.limiter,
            &self.protocol,
            &params,
            &self.locale,
        )
        .await?;

        if let Some(interval) = self.post_decode_interval {
            tokio::time::sleep(interval).await;
        }
        Ok(url)
    }
}

#[async_trait]
impl UrlResolver for GoogleNewsDecoder {
    #[instrument(level = "info", skip(self))]
    async fn resolve(&self, obfuscated_url: &str) -> ResolvedUrl {
        match self.decode(obfuscated_url).await {
            Ok(url) => {
                info!(%url, "decoded aggregator link");
                ResolvedUrl::Resolved { url }
            }
            Err(reason) => {
                warn!(error = %reason, revision = self.protocol.revision, "failed to decode aggregator link");
                ResolvedUrl::Unresolved { reason }
            }
        }
    }
}
