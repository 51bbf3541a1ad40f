//! Per-metric value store with independent time-to-live.
//!
//! An entry is fresh while `now - fetched_at < ttl`. The TTL comes from the
//! metric prefix (the first dot-separated segment) when an override exists
//! and from the default otherwise. Entries are never evicted: a stale value
//! stays available for callers that prefer old data to no data.

use crate::config::DataSourcesConfig;
use crate::metrics::data::DataPoint;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A cached data point and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub point: DataPoint,
    pub fetched_at: Instant,
}

/// Metric cache keyed by metric name.
#[derive(Debug, Clone)]
pub struct MetricCache {
    entries: HashMap<String, CacheEntry>,
    default_ttl: Duration,
    ttl_overrides: HashMap<String, Duration>,
}

impl MetricCache {
    /// Create an empty cache.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            ttl_overrides: HashMap::new(),
        }
    }

    /// Create a cache with the TTLs from the data source configuration.
    pub fn from_config(config: &DataSourcesConfig) -> Self {
        config.ttl_overrides.iter().fold(
            Self::new(Duration::from_secs(config.cache_ttl)),
            |cache, (prefix, secs)| cache.with_ttl_override(prefix, Duration::from_secs(*secs)),
        )
    }

    /// Use `ttl` for every metric whose first segment is `prefix`.
    pub fn with_ttl_override(mut self, prefix: impl Into<String>, ttl: Duration) -> Self {
        self.ttl_overrides.insert(prefix.into(), ttl);
        self
    }

    /// TTL that applies to `metric`.
    pub fn ttl_for(&self, metric: &str) -> Duration {
        let prefix = metric.split('.').next().unwrap_or(metric);
        self.ttl_overrides
            .get(prefix)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Whether `metric` has an entry younger than its TTL.
    pub fn is_fresh(&self, metric: &str, now: Instant) -> bool {
        self.entries
            .get(metric)
            .is_some_and(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl_for(metric))
    }

    /// The cached value of `metric` if it is still fresh.
    pub fn get_fresh(&self, metric: &str, now: Instant) -> Option<&DataPoint> {
        if self.is_fresh(metric, now) {
            self.entries.get(metric).map(|entry| &entry.point)
        } else {
            None
        }
    }

    /// The cached value of `metric` regardless of age.
    pub fn get(&self, metric: &str) -> Option<&DataPoint> {
        self.entries.get(metric).map(|entry| &entry.point)
    }

    /// Age of the cached value of `metric`.
    pub fn age(&self, metric: &str, now: Instant) -> Option<Duration> {
        self.entries
            .get(metric)
            .map(|entry| now.saturating_duration_since(entry.fetched_at))
    }

    /// Store `point` under `metric`, replacing any previous entry.
    pub fn insert(&mut self, metric: impl Into<String>, point: DataPoint, now: Instant) {
        self.entries.insert(
            metric.into(),
            CacheEntry {
                point,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MetricCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::DEFAULT_CACHE_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64) -> DataPoint {
        DataPoint::new("mock", "incidents.total", value)
    }

    #[test]
    fn test_fresh_until_ttl() {
        let start = Instant::now();
        let mut cache = MetricCache::new(Duration::from_secs(60));
        cache.insert("incidents.total", point(42.0), start);

        assert!(cache.is_fresh("incidents.total", start + Duration::from_secs(59)));
        assert!(!cache.is_fresh("incidents.total", start + Duration::from_secs(60)));
        assert!(cache.get_fresh("incidents.total", start + Duration::from_secs(61)).is_none());

        // Stale entries stay readable
        assert_eq!(
            cache.get("incidents.total").map(|p| p.value.as_f64()),
            Some(Some(42.0))
        );
    }

    #[test]
    fn test_prefix_override() {
        let cache = MetricCache::new(Duration::from_secs(60))
            .with_ttl_override("system_health", Duration::from_secs(300));

        assert_eq!(cache.ttl_for("system_health.percentage"), Duration::from_secs(300));
        assert_eq!(cache.ttl_for("incidents.total"), Duration::from_secs(60));
    }

    #[test]
    fn test_insert_replaces_entry() {
        let start = Instant::now();
        let mut cache = MetricCache::default();
        cache.insert("incidents.total", point(1.0), start);
        cache.insert("incidents.total", point(2.0), start + Duration::from_secs(5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("incidents.total").unwrap().value.as_f64(), Some(2.0));
        assert_eq!(
            cache.age("incidents.total", start + Duration::from_secs(6)),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = DataSourcesConfig::default();
        config.cache_ttl = 30;
        config.ttl_overrides.insert("incidents".to_string(), 10);

        let cache = MetricCache::from_config(&config);
        assert_eq!(cache.ttl_for("incidents.critical"), Duration::from_secs(10));
        assert_eq!(cache.ttl_for("service_requests.total"), Duration::from_secs(30));
    }
}
