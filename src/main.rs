//! # Article Resolver
//!
//! Searches Google News for a query, decodes each hit to the publisher URL,
//! extracts the article text and writes one JSON report per run.
//!
//! ## Usage
//!
//! ```sh
//! article_resolver -q "nuclear energy policy" -j ./json
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`). Ctrl-C stops the
//! run after the entry in progress; finished articles are still written.

use article_resolver::config::Config;
use article_resolver::outputs::json::{QueryReport, write_report};
use article_resolver::pipeline::ArticleResolutionPipeline;
use article_resolver::utils::ensure_writable_dir;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_resolver starting up");

    let args = Cli::parse();
    debug!(?args.query, ?args.json_output_dir, ?args.config, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut config = Config::load_or_default(args.config.as_deref().map(Path::new))?;
    args.apply_overrides(&mut config);
    config.validate()?;
    info!(
        language = %config.language,
        region = %config.region,
        max_articles = config.max_articles,
        "Configuration ready"
    );

    let pipeline = ArticleResolutionPipeline::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current article");
            on_signal.cancel();
        }
    });

    let articles = pipeline
        .resolve(&args.query, config.max_articles, &cancel)
        .await?;
    let with_content = articles.iter().filter(|a| !a.content.is_empty()).count();

    let report = QueryReport::new(&args.query, articles);
    if let Err(e) = write_report(&report, &args.json_output_dir).await {
        error!(error = %e, "Failed to write JSON report");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = report.articles.len(),
        with_content,
        "Execution complete"
    );

    Ok(())
}
