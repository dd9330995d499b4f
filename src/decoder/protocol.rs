//! Markup and endpoint assumptions of the aggregator's decode protocol.
//!
//! The decode flow depends on an undocumented endpoint and on the shape of
//! the aggregator's article page. All of those assumptions live in one
//! [`DecoderProtocol`] value, tagged with a revision string, instead of
//! being spread through the decoding logic. When the aggregator changes its
//! front-end, a new revision is added here and the three steps stay as they
//! are.

/// Values the three decode steps read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderProtocol {
    /// Identifies this set of assumptions in logs.
    pub revision: &'static str,
    /// Host every obfuscated link must carry.
    pub host: String,
    /// Route names accepted as the second-to-last path segment.
    pub routes: Vec<String>,
    /// Article page templates tried in order; `{token}` is substituted.
    pub param_templates: Vec<String>,
    /// CSS selector of the element carrying the signing attributes.
    pub params_selector: String,
    pub signature_attr: String,
    pub timestamp_attr: String,
    /// The internal batch-execute endpoint.
    pub batch_endpoint: String,
    /// RPC identifier of the URL lookup call.
    pub rpc_id: String,
    /// Trailing sentinel elements of the batch response to discard.
    pub response_trailer_len: usize,
}

impl DecoderProtocol {
    /// Google News as observed in late 2024.
    pub fn google_news_v1() -> Self {
        Self {
            revision: "google-news/2024-10",
            host: "news.google.com".to_string(),
            routes: vec!["articles".to_string(), "read".to_string()],
            param_templates: vec![
                "https://news.google.com/articles/{token}".to_string(),
                "https://news.google.com/rss/articles/{token}".to_string(),
            ],
            params_selector: "c-wiz > div[jscontroller]".to_string(),
            signature_attr: "data-n-a-sg".to_string(),
            timestamp_attr: "data-n-a-ts".to_string(),
            batch_endpoint: "https://news.google.com/_/DotsSplashUi/data/batchexecute".to_string(),
            rpc_id: "Fbv4je".to_string(),
            response_trailer_len: 2,
        }
    }

    /// The same protocol served from another host, for mirrors and tests.
    pub fn with_host(mut self, host: &str) -> Self {
        let old = format!("https://{}/", self.host);
        let new = format!("https://{host}/");
        for t in &mut self.param_templates {
            *t = t.replace(&old, &new);
        }
        self.batch_endpoint = self.batch_endpoint.replace(&old, &new);
        self.host = host.to_string();
        self
    }

    pub fn param_urls(&self, token: &str) -> Vec<String> {
        self.param_templates
            .iter()
            .map(|t| t.replace("{token}", token))
            .collect()
    }
}

impl Default for DecoderProtocol {
    fn default() -> Self {
        Self::google_news_v1()
    }
}
