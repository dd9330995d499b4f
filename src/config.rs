//! Runtime configuration.
//!
//! Loaded from an optional YAML file. Every key has a default, so an empty
//! file (or no file at all) gives a working setup:
//!
//! ```yaml
//! language: en
//! region: US
//! max_articles: 5
//! aggregator:
//!   min_interval_ms: 2000
//! extraction:
//!   min_content_length: 100
//!   strategies: [readability, consent_unwrap, article_parser, headless_render, raw_html]
//! ```
//!
//! Intervals are written in milliseconds and timeouts in seconds; the
//! accessor methods turn them into [`Duration`]s.

use crate::error::ConfigError;
use crate::extract::consent::DEFAULT_CONSENT_HOST;
use crate::feed::GOOGLE_NEWS_SEARCH_URL;
use crate::http::DEFAULT_USER_AGENT;
use crate::models::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    pub language: String,
    pub region: String,
    pub max_articles: usize,
    pub http_timeout_secs: u64,
    pub aggregator: AggregatorConfig,
    pub publisher: PublisherConfig,
    pub feed: FeedConfig,
    pub extraction: ExtractionConfig,
    pub pipeline: PipelineConfig,
}

/// Spacing of calls to the aggregator host (feed and decoder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub min_interval_ms: u64,
    pub post_decode_interval_ms: Option<u64>,
}

/// Spacing of calls to any single publisher host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub min_content_length: usize,
    pub strategies: Vec<StrategyKind>,
    pub consent_hosts: Vec<String>,
    pub browser_pool_size: usize,
    pub headless_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extract_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
            max_articles: 5,
            http_timeout_secs: 10,
            aggregator: AggregatorConfig::default(),
            publisher: PublisherConfig::default(),
            feed: FeedConfig::default(),
            extraction: ExtractionConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
            post_decode_interval_ms: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: GOOGLE_NEWS_SEARCH_URL.to_string(),
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_length: 100,
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            consent_hosts: vec![DEFAULT_CONSENT_HOST.to_string()],
            browser_pool_size: 2,
            headless_timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extract_concurrency: 1,
        }
    }
}

impl Config {
    /// Read and validate a YAML config file.
    #[instrument(level = "info")]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults when `path` is `None`, otherwise [`Config::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                info!("no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a map.
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.extraction.strategies.is_empty() {
            return invalid("extraction.strategies must name at least one strategy");
        }
        if self.extraction.browser_pool_size == 0 {
            return invalid("extraction.browser_pool_size must be at least 1");
        }
        if self.pipeline.extract_concurrency == 0 {
            return invalid("pipeline.extract_concurrency must be at least 1");
        }
        if self.feed.base_url.trim().is_empty() {
            return invalid("feed.base_url must not be empty");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl AggregatorConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn post_decode_interval(&self) -> Option<Duration> {
        self.post_decode_interval_ms.map(Duration::from_millis)
    }
}

impl PublisherConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl FeedConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl ExtractionConfig {
    pub fn headless_timeout(&self) -> Duration {
        Duration::from_secs(self.headless_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.aggregator.min_interval(), Duration::from_secs(2));
        assert_eq!(c.aggregator.post_decode_interval(), None);
        assert_eq!(c.extraction.min_content_length, 100);
        assert_eq!(c.extraction.strategies[0], StrategyKind::Readability);
        assert_eq!(c.extraction.strategies.len(), 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let c = Config::from_yaml(
            "region: GB\nextraction:\n  min_content_length: 250\n  strategies: [article_parser, raw_html]\n",
        )
        .unwrap();
        assert_eq!(c.region, "GB");
        assert_eq!(c.language, "en");
        assert_eq!(c.extraction.min_content_length, 250);
        assert_eq!(
            c.extraction.strategies,
            vec![StrategyKind::ArticleParser, StrategyKind::RawHtml]
        );
        assert_eq!(c.extraction.browser_pool_size, 2);
        assert_eq!(c.publisher.min_interval_ms, 1000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(matches!(
            Config::from_yaml("extraction:\n  strategies: [magic]\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        for yaml in [
            "extraction:\n  strategies: []\n",
            "extraction:\n  browser_pool_size: 0\n",
            "pipeline:\n  extract_concurrency: 0\n",
        ] {
            assert!(
                matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))),
                "{yaml}"
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "aggregator:\n  post_decode_interval_ms: 500").unwrap();
        let c = Config::load(file.path()).unwrap();
        assert_eq!(
            c.aggregator.post_decode_interval(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/article_resolver.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
