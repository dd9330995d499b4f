//! Error types for every stage of article resolution.
//!
//! Only [`PipelineError`] ever reaches the caller of the pipeline. The other
//! enums are recovered locally: decode failures fall back to the raw feed
//! link, strategy failures advance the extractor to its next strategy.

use thiserror::Error;

/// Failure of a single HTTP round trip.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Why an obfuscated aggregator link could not be decoded.
///
/// Each variant names the protocol step that broke so logs show exactly
/// where resolution stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid aggregator URL format: {0}")]
    InvalidUrlFormat(String),

    #[error("decoding parameters unavailable: {0}")]
    DecodingParamsUnavailable(String),

    #[error("signed decode request failed: {0}")]
    DecodeRequestFailed(String),
}

/// Failure of one extraction strategy on one URL.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("extracted text too short ({len} < {min} chars)")]
    TooShort { len: usize, min: usize },

    #[error("strategy does not apply to this URL")]
    NotApplicable,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("browser error: {0}")]
    Browser(String),
}

/// The search feed could not be fetched or parsed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("feed parsing failed: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("feed search failed: {0}")]
    Feed(#[from] FeedError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
