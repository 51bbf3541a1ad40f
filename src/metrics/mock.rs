//! Mock data source producing realistic-looking ITSM metrics.
//!
//! Values are random within plausible ranges unless fixed in the
//! configuration, which makes the source usable both for demos and for
//! deterministic scenario tests.

use crate::config::MockConfig;
use crate::error::{DashboardError, Result};
use crate::metrics::data::{DataPoint, MetricValue};
use crate::metrics::source::{local_metric_name, DataSource, SourceState};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::debug;

/// Metric names the generator knows about.
const KNOWN_METRICS: &[&str] = &[
    "incidents.total",
    "incidents.critical",
    "incidents.open",
    "incidents.resolution_rate",
    "incidents.by_priority",
    "incidents.by_state",
    "incidents.by_assignment_group",
    "service_requests.total",
    "service_requests.by_state",
    "service_requests.by_assignment_group",
    "system_health.total_systems",
    "system_health.healthy_systems",
    "system_health.percentage",
    "system_health.by_status",
];

const GROUPS: &[&str] = &["Service Desk", "Network", "Database", "Applications"];

/// Generates metrics without any network access.
pub struct MockSource {
    name: String,
    state: SourceState,
    rng: Mutex<StdRng>,
    fixed: HashMap<String, MetricValue>,
}

impl MockSource {
    /// Registry name of the mock source.
    pub const NAME: &'static str = "mock";

    pub fn new(config: &MockConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: Self::NAME.to_string(),
            state: SourceState::Disconnected,
            rng: Mutex::new(rng),
            fixed: config.values.clone(),
        }
    }

    /// Fix `metric` to `value` instead of generating it.
    pub fn with_value(mut self, metric: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.fixed.insert(metric.into(), value.into());
        self
    }

    fn generate(rng: &mut StdRng, metric: &str) -> Option<MetricValue> {
        let value = match metric {
            "incidents.total" => MetricValue::from(rng.gen_range(20..=100_u64)),
            "incidents.critical" => MetricValue::from(rng.gen_range(0..=10_u64)),
            "incidents.open" => MetricValue::from(rng.gen_range(10..=50_u64)),
            "incidents.resolution_rate" => {
                MetricValue::from((rng.gen_range(30.0..95.0_f64) * 10.0).round() / 10.0)
            }
            "incidents.by_priority" => breakdown(rng, &["P1", "P2", "P3", "P4"], 0..=25),
            "incidents.by_state" => {
                breakdown(rng, &["New", "In Progress", "On Hold", "Resolved"], 0..=30)
            }
            "incidents.by_assignment_group" | "service_requests.by_assignment_group" => {
                breakdown(rng, GROUPS, 0..=20)
            }
            "service_requests.total" => MetricValue::from(rng.gen_range(5..=60_u64)),
            "service_requests.by_state" => {
                breakdown(rng, &["Pending Approval", "Approved", "In Progress"], 0..=20)
            }
            "system_health.total_systems" => MetricValue::from(20_u64),
            "system_health.healthy_systems" => MetricValue::from(rng.gen_range(14..=20_u64)),
            "system_health.percentage" => MetricValue::from(rng.gen_range(70..=100_u64)),
            "system_health.by_status" => breakdown(rng, &["up", "degraded", "down"], 0..=10),
            other if other.starts_with("custom.") && other.ends_with(".count") => {
                MetricValue::from(rng.gen_range(0..=25_u64))
            }
            _ => return None,
        };
        Some(value)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(&MockConfig::default())
    }
}

fn breakdown(
    rng: &mut StdRng,
    labels: &[&str],
    range: std::ops::RangeInclusive<u64>,
) -> MetricValue {
    let map: BTreeMap<String, f64> = labels
        .iter()
        .map(|label| (label.to_string(), rng.gen_range(range.clone()) as f64))
        .collect();
    MetricValue::Map(map)
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SourceState {
        self.state
    }

    async fn connect(&mut self) -> Result<bool> {
        if self.state == SourceState::Shutdown {
            return Err(DashboardError::source_error(&self.name, "source was shut down"));
        }
        self.state = SourceState::Connected;
        Ok(true)
    }

    async fn fetch_data(&self, metrics: &[String]) -> Result<HashMap<String, DataPoint>> {
        if self.state == SourceState::Shutdown {
            return Err(DashboardError::source_error(&self.name, "source was shut down"));
        }

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DashboardError::source_error(&self.name, "generator lock poisoned"))?;

        let mut result = HashMap::new();
        for metric in metrics {
            let local = local_metric_name(&self.name, metric);
            let value = match self.fixed.get(local) {
                Some(value) => Some(value.clone()),
                None => Self::generate(&mut rng, local),
            };
            match value {
                Some(value) => {
                    result.insert(metric.clone(), DataPoint::new(&self.name, metric, value));
                }
                None => debug!("Mock source has no metric {}", metric),
            }
        }
        Ok(result)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state = SourceState::Shutdown;
        Ok(())
    }

    fn available_metrics(&self) -> BTreeSet<String> {
        KNOWN_METRICS
            .iter()
            .map(|m| m.to_string())
            .chain(self.fixed.keys().cloned())
            .collect()
    }
}
