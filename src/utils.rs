//! Utility functions for text normalization, logging and the file system.
//!
//! This module provides helpers used throughout the crate:
//! - Entity decoding and whitespace normalization for feed and page text
//! - String truncation for logging long bodies
//! - File system validation for the output directory

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

/// Decode HTML entities and collapse all whitespace to single spaces.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  Fish &amp; Chips\n\t"), "Fish & Chips");
/// ```
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Like [`clean_text`], but also strips tags first.
///
/// Feed descriptions arrive as escaped HTML snippets (a link plus the
/// publisher name), so the entities are decoded before the tags are removed.
pub fn strip_markup(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let untagged = RE_TAGS.replace_all(&decoded, " ");
    RE_WS.replace_all(&untagged, " ").trim().to_string()
}

/// Normalize extracted article text while keeping paragraph breaks.
///
/// Runs of spaces and tabs inside a line collapse to one space, lines are
/// trimmed and blank lines dropped.
pub fn normalize_paragraphs(s: &str) -> String {
    s.lines()
        .map(|line| RE_INLINE_WS.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Length in characters, the unit of the minimum-content threshold.
pub fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Fish &amp; Chips\n\t"), "Fish & Chips");
        assert_eq!(clean_text("&quot;Quoted&quot;  words"), "\"Quoted\" words");
    }

    #[test]
    fn test_strip_markup_on_feed_description() {
        let desc = "<a href=\"https://news.google.com/rss/articles/x\">Grid expands</a>&nbsp;&nbsp;<font color=\"#6f6f6f\">Reuters</font>";
        assert_eq!(strip_markup(desc), "Grid expands Reuters");
    }

    #[test]
    fn test_normalize_paragraphs() {
        let s = "  First   line \n\n\n\tSecond\t\tline  \n   \n";
        assert_eq!(normalize_paragraphs(s), "First line\nSecond line");
    }

    #[test]
    fn test_char_len_counts_chars_not_bytes() {
        assert_eq!(char_len("  é ü  "), 3);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "é".repeat(10);
        assert_eq!(truncate_for_log(&s, 3), "ééé…(+14 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested/out");
        let target = target.to_str().unwrap();
        ensure_writable_dir(target).await.unwrap();
        assert!(std::path::Path::new(target).is_dir());
    }
}
