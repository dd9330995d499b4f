//! Last resort: every tag stripped from the raw page.

use super::{Attempt, ExtractionStrategy, PageFetcher};
use crate::error::StrategyError;
use crate::models::StrategyKind;
use crate::utils::clean_text;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Drop scripts, styles, comments and tags, then decode entities and
/// collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let s = RE_SCRIPT.replace_all(html, " ");
    let s = RE_STYLE.replace_all(&s, " ");
    let s = RE_COMMENT.replace_all(&s, " ");
    let s = RE_TAG.replace_all(&s, " ");
    clean_text(&s)
}

pub struct RawHtmlStrategy {
    fetcher: PageFetcher,
}

impl RawHtmlStrategy {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ExtractionStrategy for RawHtmlStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RawHtml
    }

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError> {
        let html = self.fetcher.fetch_html(url).await?;
        Ok(Attempt::Text(strip_html(&html)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = r#"<html><head><style>p { color: red; }</style>
            <script type="text/javascript">var a = "<p>not text</p>";</script></head>
            <body><!-- ad slot --><h1>Fees &amp; permits</h1>
            <p>Line one.</p>

            <p>Line&nbsp;two.</p></body></html>"#;
        assert_eq!(strip_html(html), "Fees & permits Line one. Line two.");
    }

    #[test]
    fn test_strip_html_empty() {
        assert_eq!(strip_html("<div><br/></div>"), "");
    }
}
