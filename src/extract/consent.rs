//! Consent-wall unwrapping.
//!
//! Some links land on a cookie-consent interstitial that carries the real
//! destination in its `continue` query parameter. This strategy fetches
//! nothing itself; it hands the destination back to the extractor, which
//! restarts the strategy list there.

use super::{Attempt, ExtractionStrategy};
use crate::error::StrategyError;
use crate::models::StrategyKind;
use async_trait::async_trait;
use url::Url;

pub const DEFAULT_CONSENT_HOST: &str = "consent.google.com";

pub struct ConsentUnwrap {
    hosts: Vec<String>,
}

impl ConsentUnwrap {
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    /// The `continue` destination, if `url` is a consent page pointing at one.
    pub fn continue_target(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        if !self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return None;
        }

        let target = parsed
            .query_pairs()
            .find(|(k, _)| k == "continue")
            .map(|(_, v)| v.into_owned())?;
        let dest = Url::parse(&target).ok()?;
        if !matches!(dest.scheme(), "http" | "https") || target == url {
            return None;
        }
        Some(target)
    }
}

impl Default for ConsentUnwrap {
    fn default() -> Self {
        Self::new(vec![DEFAULT_CONSENT_HOST.to_string()])
    }
}

#[async_trait]
impl ExtractionStrategy for ConsentUnwrap {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ConsentUnwrap
    }

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError> {
        self.continue_target(url)
            .map(Attempt::Redirect)
            .ok_or(StrategyError::NotApplicable)
    }
}
