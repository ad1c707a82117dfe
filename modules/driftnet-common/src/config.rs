//! Crawl configuration loaded from a TOML file.
//!
//! Every section and field has a default, so a minimal config only needs the
//! pieces it actually overrides (credentials, vocabulary). CLI flags override
//! the `[run]` section at the call site.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CrawlError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub domain: DomainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Default platform when `--platform` is not given: "reddit" or "hn".
    pub platform: String,
    /// Stop after this many items have been written.
    pub max_items: u64,
    /// Lookback horizon in hours, reported in the run banner.
    pub hours: u32,
    /// Output directory for records, tables, and metrics.
    pub out_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Request-rate ceiling enforced inside the fetch clients.
    pub qps: f64,
    /// Items with normalized text shorter than this are filtered, not errored.
    pub min_text_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Harvest threshold: minimum content score to persist an item.
    pub tau_data: f64,
    /// Exploration threshold: minimum priority to keep discovering descendants.
    pub tau_frontier: f64,
    pub half_life_hours: f64,
    pub brand_bonus: f64,
    pub policy_bonus: f64,
}

/// Opaque credential pass-through for the primary platform.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Seed communities searched against every keyword.
    #[serde(alias = "subreddits")]
    pub communities: Vec<String>,
    pub keywords: Vec<String>,
    pub brands: Vec<String>,
    pub policies: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            platform: "hn".to_string(),
            max_items: 2000,
            hours: 72,
            out_dir: "data/processed".to_string(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            qps: 0.8,
            min_text_len: 30,
        }
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            tau_data: 2.0,
            tau_frontier: 1.2,
            half_life_hours: 72.0,
            brand_bonus: 0.7,
            policy_bonus: 0.4,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing file or bad TOML is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| CrawlError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Seed (community, keyword) pairs: the cross product of the configured
    /// communities and keywords.
    pub fn seed_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for community in &self.domain.communities {
            for keyword in &self.domain.keywords {
                pairs.push((community.clone(), keyword.clone()));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_empty_config() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.run.platform, "hn");
        assert_eq!(cfg.run.max_items, 2000);
        assert_eq!(cfg.crawler.min_text_len, 30);
        assert!((cfg.relevance.tau_data - 2.0).abs() < f64::EPSILON);
        assert!(cfg.domain.keywords.is_empty());
    }

    #[test]
    fn seed_pairs_are_cross_product() {
        let cfg: Config = toml::from_str(
            r#"
            [domain]
            communities = ["a", "b"]
            keywords = ["x", "y", "z"]
            "#,
        )
        .unwrap();
        let pairs = cfg.seed_pairs();
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], ("a".to_string(), "x".to_string()));
        assert_eq!(pairs[5], ("b".to_string(), "z".to_string()));
    }

    #[test]
    fn subreddits_alias_accepted() {
        let cfg: Config = toml::from_str(
            r#"
            [domain]
            subreddits = ["electricvehicles"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.domain.communities, vec!["electricvehicles"]);
    }
}
