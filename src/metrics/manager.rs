//! Data manager: owns the data sources and the metric cache.

use crate::config::DashboardConfig;
use crate::metrics::cache::MetricCache;
use crate::metrics::data::Snapshot;
use crate::metrics::mock::MockSource;
use crate::metrics::source::BoxedDataSource;
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Routes metric requests to data sources and caches the answers.
pub struct DataManager {
    sources: BTreeMap<String, BoxedDataSource>,
    default_source: Option<String>,
    cache: MetricCache,
    /// Metrics already reported as unroutable
    unroutable: BTreeSet<String>,
}

impl DataManager {
    /// Create a manager without sources.
    pub fn new(cache: MetricCache) -> Self {
        Self {
            sources: BTreeMap::new(),
            default_source: None,
            cache,
            unroutable: BTreeSet::new(),
        }
    }

    /// Create a manager with the cache policy and routing from `config`.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(MetricCache::from_config(&config.data_sources))
            .with_default_source(config.data_sources.default.clone())
    }

    /// Route every metric to `source` instead of by prefix.
    pub fn with_default_source(mut self, source: Option<String>) -> Self {
        self.default_source = source;
        self
    }

    /// Register a source under its own name.
    pub fn add_source(&mut self, source: BoxedDataSource) {
        let name = source.name().to_string();
        if self.sources.insert(name.clone(), source).is_some() {
            warn!("Data source {} registered twice, keeping the latest", name);
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    /// Source owning `metric`, in order: the default source, the only
    /// source, the source named by the metric's first segment, then the
    /// mock source when it is registered.
    fn route<'a>(&'a self, metric: &'a str) -> Option<&'a str> {
        if let Some(default) = self.default_source.as_deref() {
            return Some(default);
        }
        if self.sources.len() == 1 {
            return self.sources.keys().next().map(String::as_str);
        }
        if let Some((prefix, _)) = metric.split_once('.') {
            if let Some((name, _)) = self.sources.get_key_value(prefix) {
                return Some(name.as_str());
            }
        }
        self.sources
            .get_key_value(MockSource::NAME)
            .map(|(name, _)| name.as_str())
    }

    /// Connect every source concurrently. Returns whether all succeeded.
    pub async fn connect_all(&mut self) -> bool {
        if self.sources.is_empty() {
            warn!("No data sources to connect");
            return false;
        }

        let results = join_all(
            self.sources
                .iter_mut()
                .map(|(name, source)| async move { (name.as_str(), source.connect().await) }),
        )
        .await;

        let mut all_connected = true;
        for (name, result) in results {
            match result {
                Ok(true) => info!("Connected to data source: {}", name),
                Ok(false) => {
                    warn!("Data source {} refused the connection", name);
                    all_connected = false;
                }
                Err(e) => {
                    warn!("Failed to connect data source {}: {}", name, e);
                    all_connected = false;
                }
            }
        }
        all_connected
    }

    /// Return a snapshot of `names`, fetching whatever is missing or stale.
    ///
    /// Fresh entries never touch the network. Missing and stale metrics are
    /// grouped by owning source and fetched with one concurrent call per
    /// source. A failing source only loses its own metrics for this call;
    /// metrics that could not be refreshed are served from the cache even
    /// past their TTL.
    pub async fn get_or_fetch(&mut self, names: &BTreeSet<String>, now: Instant) -> Snapshot {
        let mut snapshot = Snapshot::new();
        let mut pending: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for name in names {
            if let Some(point) = self.cache.get_fresh(name, now) {
                snapshot.insert(name.clone(), point.clone());
                continue;
            }
            match self.route(name) {
                Some(source) => pending
                    .entry(source.to_string())
                    .or_default()
                    .push(name.clone()),
                None => {
                    if self.unroutable.insert(name.clone()) {
                        warn!(
                            "No data source routes metric {}; set data_sources.default",
                            name
                        );
                    }
                }
            }
        }

        if !pending.is_empty() {
            let fetches = pending.iter().filter_map(|(source_name, metrics)| {
                let Some(source) = self.sources.get(source_name) else {
                    debug!("Metrics {:?} route to unknown source {}", metrics, source_name);
                    return None;
                };
                Some(async move { (source_name.as_str(), source.fetch_data(metrics).await) })
            });
            let results = join_all(fetches).await;

            for (source_name, result) in results {
                match result {
                    Ok(points) => {
                        debug!("Fetched {} metrics from {}", points.len(), source_name);
                        for (metric, point) in points {
                            if names.contains(&metric) {
                                snapshot.insert(metric.clone(), point.clone());
                            }
                            self.cache.insert(metric, point, now);
                        }
                    }
                    Err(e) => warn!("Fetch from data source {} failed: {}", source_name, e),
                }
            }
        }

        for name in names {
            if snapshot.contains_key(name) {
                continue;
            }
            if let Some(point) = self.cache.get(name) {
                debug!("Serving stale value for {}", name);
                snapshot.insert(name.clone(), point.clone());
            }
        }

        snapshot
    }

    /// Disconnect every source. Failures are logged and never stop the
    /// remaining sources from shutting down.
    pub async fn disconnect_all(&mut self) {
        let results = join_all(
            self.sources
                .iter_mut()
                .map(|(name, source)| async move { (name.as_str(), source.disconnect().await) }),
        )
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                warn!("Data source {} did not disconnect cleanly: {}", name, e);
            }
        }
        info!("Disconnected from all data sources");
    }
}
