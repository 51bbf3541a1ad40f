//! Data source capability.

use crate::error::Result;
use crate::metrics::data::DataPoint;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Connection lifecycle of a data source.
///
/// Sources move from `Disconnected` to `Connected` and end in `Shutdown`;
/// a source in `Shutdown` refuses every further call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Disconnected,
    Connected,
    Shutdown,
}

/// Trait for everything that produces metrics.
///
/// Implementations enforce their own network timeouts; the dispatch loop
/// never cancels a fetch.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Registry name of this source, also the metric prefix it owns.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;

    /// Establish the connection. `Ok(false)` means the remote answered but
    /// refused; fetches may still be attempted later.
    async fn connect(&mut self) -> Result<bool>;

    /// Fetch the named metrics.
    ///
    /// Metrics the source cannot provide are left out of the result. An
    /// error means nothing could be fetched at all.
    async fn fetch_data(&self, metrics: &[String]) -> Result<HashMap<String, DataPoint>>;

    /// Release the connection. The source cannot be reused afterwards.
    async fn disconnect(&mut self) -> Result<()>;

    /// Metric names this source knows how to produce.
    fn available_metrics(&self) -> BTreeSet<String>;
}

/// Type-erased data source for the registry and the data manager
pub type BoxedDataSource = Box<dyn DataSource>;

/// Strip the `<source>.` prefix a metric carries when it was routed by prefix.
pub fn local_metric_name<'a>(source: &str, metric: &'a str) -> &'a str {
    metric
        .strip_prefix(source)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(metric)
}
