//! Command-line interface definitions for the article resolver.
//!
//! Options that also live in the config file (`language`, `region`,
//! `max_articles`) override it when given.

use article_resolver::config::Config;
use clap::Parser;

/// Search the news aggregator for a query and resolve each hit to the
/// publisher's article text.
///
/// # Examples
///
/// ```sh
/// # Five articles, default config
/// article_resolver -q "nuclear energy policy" -j ./json
///
/// # Ten French-language articles with a config file
/// article_resolver -q "énergie nucléaire" -j ./json -n 10 --language fr --region FR --config ./resolver.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search query sent to the news feed
    #[arg(short, long)]
    pub query: String,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Maximum number of articles to resolve
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "ARTICLE_RESOLVER_CONFIG")]
    pub config: Option<String>,

    /// Feed language, e.g. `en`
    #[arg(long)]
    pub language: Option<String>,

    /// Feed region, e.g. `US`
    #[arg(long)]
    pub region: Option<String>,
}

impl Cli {
    /// Apply command-line overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(n) = self.max_articles {
            config.max_articles = n;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "article_resolver",
            "--query",
            "nuclear energy policy",
            "--json-output-dir",
            "./json",
        ]);

        assert_eq!(cli.query, "nuclear energy policy");
        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.max_articles, None);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "article_resolver",
            "-q",
            "grid",
            "-j",
            "/tmp/json",
            "-n",
            "3",
            "-c",
            "/etc/resolver.yaml",
        ]);

        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.max_articles, Some(3));
        assert_eq!(cli.config.as_deref(), Some("/etc/resolver.yaml"));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "article_resolver",
            "-q",
            "grid",
            "-j",
            "out",
            "--language",
            "fr",
            "--region",
            "FR",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.language, "fr");
        assert_eq!(config.region, "FR");
        assert_eq!(config.max_articles, 5);
    }
}
