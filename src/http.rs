//! The HTTP seam used by the feed searcher, the decoder and the extractors.
//!
//! Every network call in the crate goes through [`HttpClient`], so the
//! brittle upstream protocols can be exercised in tests against scripted
//! responses. [`ReqwestClient`] is the production implementation: a single
//! pooled `reqwest::Client` with a browser-like User-Agent (several upstream
//! hosts reject obvious bots) and a bounded per-request timeout.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tracing::{debug, instrument};

/// User-Agent sent when configuration doesn't override it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`FetchError::Status`].
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
                url: self.url,
            })
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;

    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn read(resp: reqwest::Response) -> Result<HttpResponse, FetchError> {
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(%url, status, bytes = body.len(), "HTTP response read");
        Ok(HttpResponse { url, status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = self.client.get(url).send().await?;
        Self::read(resp).await
    }

    #[instrument(level = "debug", skip(self, body))]
    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, FetchError> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .body(body)
            .send()
            .await?;
        Self::read(resp).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Status(u16, String),
        NetworkError,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub method: &'static str,
        pub url: String,
        pub body: Option<String>,
    }

    /// Replies keyed by exact URL; unknown URLs fail like an unreachable host.
    #[derive(Debug, Default)]
    pub struct FakeHttp {
        routes: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(self, url: &str, status: u16, body: &str) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), Reply::Status(status, body.to_string()));
            self
        }

        pub fn fail(self, url: &str) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), Reply::NetworkError);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, url: &str) -> usize {
            self.calls().iter().filter(|c| c.url == url).count()
        }

        fn reply(
            &self,
            method: &'static str,
            url: &str,
            body: Option<String>,
        ) -> Result<HttpResponse, FetchError> {
            self.calls.lock().unwrap().push(Call {
                method,
                url: url.to_string(),
                body,
            });
            match self.routes.lock().unwrap().get(url).cloned() {
                Some(Reply::Status(status, body)) => Ok(HttpResponse {
                    url: url.to_string(),
                    status,
                    body,
                }),
                Some(Reply::NetworkError) | None => {
                    Err(FetchError::Transport(format!("connection refused: {url}")))
                }
            }
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttp {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.reply("GET", url, None)
        }

        async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, FetchError> {
            self.reply("POST", url, Some(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            url: "https://a".into(),
            status: 204,
            body: String::new(),
        };
        assert!(ok.error_for_status().is_ok());

        let bad = HttpResponse {
            url: "https://a".into(),
            status: 429,
            body: String::new(),
        };
        match bad.error_for_status() {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 429),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).is_ok());
    }
}
