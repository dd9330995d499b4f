//! # Article Resolver
//!
//! Turns a news search query into full article records for an LLM
//! summarization stage.
//!
//! ## Architecture
//!
//! 1. **Search**: query the Google News RSS feed ([`feed`])
//! 2. **Decode**: recover each publisher URL from the aggregator's
//!    obfuscated links ([`decoder`])
//! 3. **Extract**: pull the article text with an ordered list of
//!    strategies ([`extract`])
//! 4. **Output**: serialize the records ([`outputs`])
//!
//! [`pipeline::ArticleResolutionPipeline`] composes the steps. Every call
//! to the aggregator host passes through one shared
//! [`rate_limiter::RateLimiter`].

pub mod config;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod feed;
pub mod http;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod rate_limiter;
pub mod retry;
pub mod utils;
