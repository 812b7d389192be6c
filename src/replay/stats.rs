//! Endpoint Statistics
//!
//! Per-endpoint hit counts over *attempted* requests (recorded in the pacing
//! loop before dispatch, so the table is independent of response outcomes),
//! with configurable query-parameter stripping and low-frequency bucketing
//! to keep long-tail output compact.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::{Position, Url};

#[derive(Debug, Clone, Default)]
pub struct StatsConfig {
    /// Base URL logged paths are resolved against for normalization.
    pub prefix: String,
    /// Query parameter names dropped from stats keys.
    pub delete_query: Vec<String>,
    /// Keep only the path component, dropping the query entirely.
    pub only_path: bool,
    /// Keys with at most this many hits collapse into the histogram.
    pub hide_limit: u64,
}

impl StatsConfig {
    /// Parse the comma-separated `--delete-query-stats` value.
    pub fn parse_delete_query(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Per-endpoint hit-count mapping used for traffic-shape reporting.
pub struct StatsTable {
    config: StatsConfig,
    hits: HashMap<String, u64>,
}

impl StatsTable {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            hits: HashMap::new(),
        }
    }

    pub fn record(&mut self, path: &str) {
        let key = self.normalize(path);
        *self.hits.entry(key).or_insert(0) += 1;
    }

    pub fn total_hits(&self) -> u64 {
        self.hits.values().sum()
    }

    pub fn distinct_keys(&self) -> usize {
        self.hits.len()
    }

    /// Derive the stats key for one logged path. Paths that do not resolve
    /// into a URL against the prefix are counted under their raw form.
    fn normalize(&self, path: &str) -> String {
        let Ok(mut url) = Url::parse(&format!("{}{}", self.config.prefix, path)) else {
            debug!(path, "stats key kept raw; not URL-shaped against the prefix");
            return path.to_string();
        };

        if self.config.only_path {
            return url.path().to_string();
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !self.config.delete_query.iter().any(|q| q == name))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        url.set_query(None);
        if !kept.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &kept {
                pairs.append_pair(name, value);
            }
        }

        url[Position::BeforePath..].to_string()
    }

    /// Sorted descending by count. Keys above the hide limit print
    /// individually; the rest collapse into a `{count: distinct_keys}`
    /// histogram rendered as one JSON line.
    pub fn render(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &u64)> = self.hits.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut lines = Vec::new();
        let mut hidden: BTreeMap<u64, u64> = BTreeMap::new();
        for (key, &count) in entries {
            if count > self.config.hide_limit {
                lines.push(format!("{} : {}", key, count));
            } else {
                *hidden.entry(count).or_insert(0) += 1;
            }
        }
        if !hidden.is_empty() {
            lines.push(format!(
                "Hidden stats: {}",
                serde_json::to_string(&hidden).unwrap_or_default()
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(delete_query: &str, only_path: bool, hide_limit: u64) -> StatsTable {
        StatsTable::new(StatsConfig {
            prefix: "http://localhost:8080".to_string(),
            delete_query: StatsConfig::parse_delete_query(delete_query),
            only_path,
            hide_limit,
        })
    }

    #[test]
    fn test_parse_delete_query() {
        assert_eq!(
            StatsConfig::parse_delete_query("page, limit,size"),
            vec!["page", "limit", "size"]
        );
        assert!(StatsConfig::parse_delete_query("").is_empty());
    }

    #[test]
    fn test_only_path_drops_query() {
        let mut stats = table("", true, 0);
        stats.record("/items?page=2");
        stats.record("/items?page=3");
        stats.record("/other");
        assert_eq!(stats.total_hits(), 3);
        assert_eq!(stats.distinct_keys(), 2);
    }

    #[test]
    fn test_query_stripping_merges_keys() {
        let mut stats = table("page,limit", false, 0);
        stats.record("/items?page=1&q=shoes");
        stats.record("/items?page=2&q=shoes");
        stats.record("/items?page=2&limit=50&q=shoes");
        // All three collapse onto the same key once page/limit are gone.
        assert_eq!(stats.distinct_keys(), 1);
        assert_eq!(stats.total_hits(), 3);
    }

    #[test]
    fn test_query_stripping_is_idempotent() {
        let stats = table("page", false, 0);
        let once = stats.normalize("/items?page=1&q=a%20b");
        let twice = stats.normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unparseable_path_kept_raw() {
        let mut stats = StatsTable::new(StatsConfig {
            prefix: "not a url".to_string(),
            ..StatsConfig::default()
        });
        stats.record("/a");
        assert_eq!(stats.total_hits(), 1);
        assert_eq!(stats.normalize("/a"), "/a");
    }

    #[test]
    fn test_render_sorts_and_hides_long_tail() {
        let mut stats = table("", false, 1);
        for _ in 0..3 {
            stats.record("/hot");
        }
        for _ in 0..2 {
            stats.record("/warm");
        }
        stats.record("/cold-a");
        stats.record("/cold-b");

        let lines = stats.render();
        assert_eq!(lines[0], "/hot : 3");
        assert_eq!(lines[1], "/warm : 2");
        // Two distinct endpoints seen exactly once each.
        assert_eq!(lines[2], r#"Hidden stats: {"1":2}"#);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_render_without_hidden_entries() {
        let mut stats = table("", false, 0);
        stats.record("/a");
        let lines = stats.render();
        assert_eq!(lines, vec!["/a : 1".to_string()]);
    }
}
