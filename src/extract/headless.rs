//! Headless-browser rendering for script-built pages.
//!
//! Some publishers serve a near-empty shell and build the article in the
//! browser. [`HeadlessRender`] loads such pages through a [`PageRenderer`],
//! runs readability over the rendered DOM and falls back to the page's
//! visible text. Browser sessions are capped by a small semaphore pool and
//! each render is bounded by a timeout.
//!
//! The Chromium renderer is compiled only with the `headless` feature;
//! without it [`default_renderer`] returns [`DisabledRenderer`] and the
//! strategy always fails over to the next one.

use super::article_parser::page_metadata;
use super::readability::readability_text;
use super::{Attempt, ExtractionStrategy};
use crate::error::StrategyError;
use crate::models::StrategyKind;
use crate::rate_limiter::HostRateLimiters;
use crate::utils::{char_len, normalize_paragraphs};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// A page after scripts have run.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    pub visible_text: String,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, StrategyError>;
}

/// Renderer used when no browser is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRenderer;

#[async_trait]
impl PageRenderer for DisabledRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage, StrategyError> {
        Err(StrategyError::Browser(
            "headless rendering is not compiled in".to_string(),
        ))
    }
}

#[cfg(feature = "headless")]
pub fn default_renderer() -> Arc<dyn PageRenderer> {
    Arc::new(chromium::ChromiumRenderer::default())
}

#[cfg(not(feature = "headless"))]
pub fn default_renderer() -> Arc<dyn PageRenderer> {
    Arc::new(DisabledRenderer)
}

/// How a wait for the page's network to settle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkIdle {
    Reached,
    StreamEnded,
    TimedOut,
}

/// Consume page lifecycle event names until the navigation reports
/// `networkIdle`, for at most `limit`.
///
/// Names seen before the navigation's `init` belong to the blank start page
/// and are ignored.
pub async fn wait_for_network_idle<S, N>(events: S, limit: Duration) -> NetworkIdle
where
    S: Stream<Item = N>,
    N: AsRef<str>,
{
    let watch = async {
        let mut events = std::pin::pin!(events);
        let mut navigating = false;
        while let Some(name) = events.next().await {
            match name.as_ref() {
                "init" => navigating = true,
                "networkIdle" if navigating => return NetworkIdle::Reached,
                _ => {}
            }
        }
        NetworkIdle::StreamEnded
    };
    tokio::time::timeout(limit, watch)
        .await
        .unwrap_or(NetworkIdle::TimedOut)
}

pub struct HeadlessRender {
    renderer: Arc<dyn PageRenderer>,
    limiters: Arc<HostRateLimiters>,
    pool: Arc<Semaphore>,
    timeout: Duration,
    min_content_length: usize,
}

impl HeadlessRender {
    /// # Arguments
    /// * `renderer` - Loads and renders one page.
    /// * `limiters` - Per-host spacing shared with the plain page fetcher.
    /// * `pool_size` - Most renders in flight at once; zero is treated as one.
    /// * `timeout` - Upper bound on a single render.
    /// * `min_content_length` - Below this the rendered DOM's readability
    ///   text is discarded in favour of the visible text.
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        limiters: Arc<HostRateLimiters>,
        pool_size: usize,
        timeout: Duration,
        min_content_length: usize,
    ) -> Self {
        Self {
            renderer,
            limiters,
            pool: Arc::new(Semaphore::new(pool_size.max(1))),
            timeout,
            min_content_length,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for HeadlessRender {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadlessRender
    }

    async fn attempt(&self, url: &str) -> Result<Attempt, StrategyError> {
        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|e| StrategyError::Browser(e.to_string()))?;
        self.limiters.for_url(url).acquire().await;

        let page = tokio::time::timeout(self.timeout, self.renderer.render(url))
            .await
            .map_err(|_| StrategyError::Timeout(self.timeout))??;

        let metadata = page_metadata(&page.html);
        match readability_text(&page.html, url) {
            Ok(text) if char_len(&text) >= self.min_content_length => {
                return Ok(Attempt::Article { text, metadata });
            }
            Ok(text) => debug!(%url, chars = char_len(&text), "rendered DOM too thin, using visible text"),
            Err(e) => debug!(%url, error = %e, "readability failed on rendered DOM"),
        }
        Ok(Attempt::Article {
            text: normalize_paragraphs(&page.visible_text),
            metadata,
        })
    }
}

#[cfg(feature = "headless")]
pub mod chromium {
    //! Chromium over the DevTools protocol via `chromiumoxide`.

    use super::{NetworkIdle, PageRenderer, RenderedPage, wait_for_network_idle};
    use crate::error::StrategyError;
    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing::{debug, warn};

    const VISIBLE_TEXT: &str = "document.body ? document.body.innerText : ''";

    /// How long to wait for the network to settle after `load`.
    const NETWORK_IDLE_WAIT: Duration = Duration::from_secs(5);

    fn browser_err(e: impl std::fmt::Display) -> StrategyError {
        StrategyError::Browser(e.to_string())
    }

    /// Launches a fresh headless browser per render.
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumRenderer {
        executable: Option<PathBuf>,
    }

    impl ChromiumRenderer {
        pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
            self.executable = Some(path.into());
            self
        }

        fn launch_args() -> Vec<String> {
            let mut args = vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-extensions".to_string(),
                "--no-first-run".to_string(),
            ];
            if std::env::var("CI").is_ok() || std::env::var("NO_SANDBOX").is_ok() {
                args.push("--no-sandbox".to_string());
            }
            args
        }

        /// Navigate, then give late XHR-built content until `networkIdle`.
        async fn load(page: &Page, url: &str) -> Result<RenderedPage, StrategyError> {
            let lifecycle = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(browser_err)?;
            page.goto(url).await.map_err(browser_err)?;

            let names = lifecycle.map(|event| event.name.clone());
            match wait_for_network_idle(names, NETWORK_IDLE_WAIT).await {
                NetworkIdle::Reached => debug!(%url, "network idle"),
                NetworkIdle::StreamEnded => debug!(%url, "lifecycle events ended before network idle"),
                NetworkIdle::TimedOut => {
                    debug!(%url, wait = ?NETWORK_IDLE_WAIT, "network still busy, reading DOM anyway")
                }
            }

            let html = page.content().await.map_err(browser_err)?;
            let visible_text = page
                .evaluate(VISIBLE_TEXT)
                .await
                .map_err(browser_err)?
                .into_value::<String>()
                .map_err(browser_err)?;
            Ok(RenderedPage { html, visible_text })
        }
    }

    #[async_trait]
    impl PageRenderer for ChromiumRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage, StrategyError> {
            let mut builder = BrowserConfig::builder().args(Self::launch_args());
            if let Some(bin) = &self.executable {
                builder = builder.chrome_executable(bin);
            }
            let config = builder.build().map_err(StrategyError::Browser)?;

            let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!(error = %e, "browser handler stopped");
                        break;
                    }
                }
            });

            let rendered = match browser.new_page("about:blank").await {
                Ok(page) => Self::load(&page, url).await,
                Err(e) => Err(browser_err(e)),
            };

            if let Err(e) = browser.close().await {
                warn!(error = %e, "failed to close browser");
            }
            match browser.wait().await {
                Ok(status) => debug!(?status, "browser process exited"),
                Err(e) => warn!(error = %e, "failed to reap browser process"),
            }
            events.abort();
            rendered
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::PageMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renders every URL to the same page and records the most renders
    /// seen in flight at once.
    pub(crate) struct FakeRenderer {
        pub page: RenderedPage,
        pub delay: Duration,
        in_flight: AtomicUsize,
        pub peak: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        pub fn new(page: RenderedPage, delay: Duration) -> Self {
            Self {
                page,
                delay,
                in_flight: AtomicUsize::new(0),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, _url: &str) -> Result<RenderedPage, StrategyError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.page.clone())
        }
    }

    pub(crate) fn rendered_story() -> RenderedPage {
        let para = "Operators confirmed the new reactor design passed its final review, clearing the way for construction crews next spring.";
        RenderedPage {
            html: format!(
                "<html><body><div id=\"app\"><article><p>{para}</p><p>{para}</p></article></div></body></html>"
            ),
            visible_text: format!("{para}\n{para}"),
        }
    }

    fn strategy(renderer: FakeRenderer, timeout: Duration) -> HeadlessRender {
        HeadlessRender::new(
            Arc::new(renderer),
            Arc::new(HostRateLimiters::new(Duration::ZERO)),
            1,
            timeout,
            100,
        )
    }

    #[tokio::test]
    async fn test_renders_and_extracts() {
        let s = strategy(
            FakeRenderer::new(rendered_story(), Duration::ZERO),
            Duration::from_secs(30),
        );
        let Attempt::Article { text, .. } = s.attempt("https://www.example.com/app").await.unwrap()
        else {
            panic!("expected text");
        };
        assert!(char_len(&text) >= 100);
        assert!(text.contains("final review"));
    }

    #[tokio::test]
    async fn test_visible_text_fallback() {
        let s = strategy(
            FakeRenderer::new(
                RenderedPage {
                    html: String::new(),
                    visible_text: "  Live   blog\nupdates  ".into(),
                },
                Duration::ZERO,
            ),
            Duration::from_secs(30),
        );
        let r = s.attempt("https://www.example.com/live").await.unwrap();
        assert_eq!(
            r,
            Attempt::Article {
                text: "Live blog\nupdates".into(),
                metadata: PageMetadata::default(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timeout() {
        let s = strategy(
            FakeRenderer::new(rendered_story(), Duration::from_secs(60)),
            Duration::from_secs(30),
        );
        let r = s.attempt("https://www.example.com/slow").await;
        assert!(matches!(r, Err(StrategyError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_caps_concurrent_renders() {
        let renderer = FakeRenderer::new(rendered_story(), Duration::from_secs(1));
        let peak = renderer.peak.clone();
        let s = strategy(renderer, Duration::from_secs(30));

        let start = tokio::time::Instant::now();
        let (a, b, c) = tokio::join!(
            s.attempt("https://a.example.com/1"),
            s.attempt("https://b.example.com/2"),
            s.attempt("https://c.example.com/3"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_of_two_overlaps_renders() {
        let renderer = FakeRenderer::new(rendered_story(), Duration::from_secs(1));
        let peak = renderer.peak.clone();
        let s = HeadlessRender::new(
            Arc::new(renderer),
            Arc::new(HostRateLimiters::new(Duration::ZERO)),
            2,
            Duration::from_secs(30),
            100,
        );

        let (a, b, c) = tokio::join!(
            s.attempt("https://a.example.com/1"),
            s.attempt("https://b.example.com/2"),
            s.attempt("https://c.example.com/3"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_network_idle_after_navigation_starts() {
        let events = futures::stream::iter(["init", "DOMContentLoaded", "load", "networkIdle"]);
        assert_eq!(
            wait_for_network_idle(events, Duration::from_secs(5)).await,
            NetworkIdle::Reached
        );
    }

    #[tokio::test]
    async fn test_blank_page_idle_is_ignored() {
        let events = futures::stream::iter(["networkIdle", "init", "load"]);
        assert_eq!(
            wait_for_network_idle(events, Duration::from_secs(5)).await,
            NetworkIdle::StreamEnded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_network_gives_up_after_limit() {
        let events = futures::stream::iter(["init", "load"]).chain(futures::stream::pending());
        let start = tokio::time::Instant::now();
        assert_eq!(
            wait_for_network_idle(events, Duration::from_secs(5)).await,
            NetworkIdle::TimedOut
        );
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_disabled_renderer_fails() {
        let s = HeadlessRender::new(
            Arc::new(DisabledRenderer),
            Arc::new(HostRateLimiters::new(Duration::ZERO)),
            2,
            Duration::from_secs(1),
            100,
        );
        assert!(matches!(
            s.attempt("https://www.example.com/").await,
            Err(StrategyError::Browser(_))
        ));
    }
}
