//! Screens turn a metric snapshot into display-ready [`ScreenData`].
//!
//! Every screen is pure: it reads only the snapshot it is handed, substitutes
//! defaults for anything missing (`0` for numbers, [`PLACEHOLDER`] for text,
//! an empty breakdown for maps) and never fails.

pub mod assignment_groups;
pub mod custom_metric;
pub mod incident_summary;
pub mod priority_breakdown;
pub mod service_requests;
pub mod system_health;

pub use assignment_groups::AssignmentGroupsScreen;
pub use custom_metric::CustomMetricScreen;
pub use incident_summary::IncidentSummaryScreen;
pub use priority_breakdown::PriorityBreakdownScreen;
pub use service_requests::ServiceRequestsScreen;
pub use system_health::SystemHealthScreen;

use crate::config::DashboardConfig;
use crate::metrics::data::{ScreenData, Snapshot, PLACEHOLDER};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// A named view in the rotation.
pub trait Screen: Send + Sync {
    /// Registry name, e.g. `incident_summary`.
    fn name(&self) -> &str;

    /// Metric names this screen reads. Constant for a given instance.
    fn required_metrics(&self) -> BTreeSet<String>;

    /// Build the screen from `snapshot`.
    fn process(&self, snapshot: &Snapshot) -> ScreenData;

    /// How long the screen stays visible once selected.
    fn display_duration(&self) -> Duration;
}

/// Type-erased screen for the registry and the rotator
pub type BoxedScreen = Box<dyn Screen>;

/// Per-screen timing read from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSettings {
    pub duration: Duration,
    pub refresh_rate: u32,
}

impl ScreenSettings {
    pub fn from_config(config: &DashboardConfig, screen: &str) -> Self {
        Self {
            duration: config.screen_duration(screen),
            refresh_rate: config.screen_refresh_rate(screen),
        }
    }
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(crate::DEFAULT_ROTATION_SECS),
            refresh_rate: crate::metrics::data::DEFAULT_REFRESH_RATE,
        }
    }
}

pub(crate) fn metric_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Numeric value of `key`, `0` when missing or not numeric.
pub fn number(snapshot: &Snapshot, key: &str) -> f64 {
    snapshot
        .get(key)
        .and_then(|point| point.value.as_f64())
        .unwrap_or(0.0)
}

/// Breakdown stored under `key`, empty when missing.
pub fn breakdown(snapshot: &Snapshot, key: &str) -> BTreeMap<String, f64> {
    snapshot
        .get(key)
        .and_then(|point| point.value.as_map())
        .cloned()
        .unwrap_or_default()
}

/// `HH:MM` (UTC) of the value under `key`, [`PLACEHOLDER`] when missing.
pub fn updated_at(snapshot: &Snapshot, key: &str) -> String {
    snapshot
        .get(key)
        .map(|point| point.timestamp.format("%H:%M").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Breakdown entries sorted by descending count, ties by name.
pub fn ranked(map: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

/// Counts print without a fraction, rates keep one decimal.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
