//! Metric data structures, data sources and the caching data manager.
//!
//! Sources produce [`DataPoint`]s; the [`DataManager`] routes requests to
//! them and keeps every value in the [`MetricCache`] so screens are served
//! without hitting the network more than each metric's TTL allows.

pub mod cache;
pub mod data;
pub mod manager;
pub mod mock;
pub mod servicenow;
pub mod source;

// Re-export commonly used items
pub use cache::MetricCache;
pub use data::{DataPoint, MetricValue, ScreenData, Snapshot};
pub use manager::DataManager;
pub use mock::MockSource;
pub use servicenow::ServiceNowSource;
pub use source::{BoxedDataSource, DataSource, SourceState};
