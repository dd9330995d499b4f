//! JSON output for the downstream summarization stage.
//!
//! # Output Structure
//!
//! Files are grouped by UTC date, one file per run:
//! ```text
//! json_output_dir/
//! └── 2024-10-14/
//!     ├── query_070512.json
//!     └── query_093340.json
//! ```

use crate::models::Article;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Everything one run produced for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl QueryReport {
    pub fn new(query: &str, articles: Vec<Article>) -> Self {
        Self {
            query: query.to_string(),
            generated_at: Utc::now(),
            articles,
        }
    }

    /// `{dir}/{YYYY-MM-DD}/query_{HHMMSS}.json`, from `generated_at`.
    pub fn output_path(&self, json_output_dir: &str) -> PathBuf {
        PathBuf::from(json_output_dir)
            .join(self.generated_at.format("%Y-%m-%d").to_string())
            .join(format!("query_{}.json", self.generated_at.format("%H%M%S")))
    }
}

/// Serialize `report` under `json_output_dir` and return the file path.
///
/// # Arguments
/// * `report` - The finished run.
/// * `json_output_dir` - Root directory; the dated subdirectory is created.
///
/// # Returns
/// Path of the written file, as given by [`QueryReport::output_path`].
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(
    report: &QueryReport,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report.output_path(json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = report.articles.len(), "Wrote query report");
    Ok(path)
}
