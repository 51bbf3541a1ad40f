//! ServiceNow Table API data source.
//!
//! Fetches raw records from the configured tables and aggregates them into
//! counters and breakdowns. Each requested metric maps to one dataset; every
//! dataset needed by a request is fetched once, concurrently with the others.

use crate::config::{CustomMetricConfig, ServiceNowConfig};
use crate::error::{DashboardError, Result};
use crate::metrics::data::{DataPoint, MetricValue};
use crate::metrics::source::{local_metric_name, DataSource, SourceState};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// One table row as returned by the API.
pub type Record = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct TableResponse {
    #[serde(default)]
    result: Vec<Record>,
}

const INCIDENT_FIELDS: &[&str] = &[
    "number",
    "priority",
    "state",
    "short_description",
    "assignment_group",
    "opened_at",
];
const INCIDENT_QUERY: &str = "state!=7";

const REQUEST_FIELDS: &[&str] = &[
    "number",
    "state",
    "short_description",
    "assignment_group",
    "opened_at",
];
const REQUEST_QUERY: &str = "state!=3^state!=4";

const HEALTH_FIELDS: &[&str] = &["name", "status", "last_check", "response_time"];
const HEALTH_LIMIT: u32 = 50;
const HEALTHY_STATUSES: &[&str] = &["active", "healthy", "up", "online", "ok"];

const CUSTOM_LIMIT: u32 = 50;

const INCIDENT_METRICS: &[&str] = &[
    "total",
    "critical",
    "open",
    "resolution_rate",
    "by_priority",
    "by_state",
    "by_assignment_group",
];
const REQUEST_METRICS: &[&str] = &["total", "by_state", "by_assignment_group"];
const HEALTH_METRICS: &[&str] = &["total_systems", "healthy_systems", "percentage", "by_status"];

/// Group of metrics computed from the same table query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Dataset {
    Incidents,
    ServiceRequests,
    SystemHealth,
    Custom(String),
}

impl Dataset {
    /// Dataset owning a source-local metric name.
    fn of(metric: &str) -> Option<Self> {
        let (group, rest) = metric.split_once('.')?;
        match group {
            "incidents" => Some(Dataset::Incidents),
            "service_requests" => Some(Dataset::ServiceRequests),
            "system_health" => Some(Dataset::SystemHealth),
            "custom" => rest
                .strip_suffix(".count")
                .map(|name| Dataset::Custom(name.to_string())),
            _ => None,
        }
    }
}

/// Data source backed by a ServiceNow instance.
pub struct ServiceNowSource {
    name: String,
    config: ServiceNowConfig,
    custom_metrics: BTreeMap<String, CustomMetricConfig>,
    http: reqwest::Client,
    base_url: String,
    state: SourceState,
}

impl ServiceNowSource {
    /// Registry name of the ServiceNow source.
    pub const NAME: &'static str = "servicenow";

    /// Create a source for the instance in `config`.
    pub fn new(
        config: ServiceNowConfig,
        custom_metrics: BTreeMap<String, CustomMetricConfig>,
    ) -> Result<Self> {
        if config.instance_url.is_empty() {
            return Err(DashboardError::config_error(
                "servicenow.instance_url is required",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self {
            name: Self::NAME.to_string(),
            base_url: config.instance_url.trim_end_matches('/').to_string(),
            config,
            custom_metrics,
            http,
            state: SourceState::Disconnected,
        })
    }

    fn table(&self, dataset: &str) -> Option<&str> {
        self.config.tables.get(dataset).map(String::as_str)
    }

    /// Fetch rows from `table`.
    pub async fn fetch_table(
        &self,
        table: &str,
        fields: &[&str],
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Record>> {
        let url = format!("{}/api/now/table/{}", self.base_url, table);
        let mut params = vec![("sysparm_limit", limit.to_string())];
        if !fields.is_empty() {
            params.push(("sysparm_fields", fields.join(",")));
        }
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            params.push(("sysparm_query", query.to_string()));
        }

        debug!("GET {} {:?}", url, params);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: TableResponse = response.json().await?;
        Ok(body.result)
    }

    async fn fetch_dataset(&self, dataset: &Dataset) -> Result<BTreeMap<String, MetricValue>> {
        match dataset {
            Dataset::Incidents => {
                let table = self.table("incidents").ok_or_else(|| self.unconfigured("incidents"))?;
                let rows = self
                    .fetch_table(table, INCIDENT_FIELDS, Some(INCIDENT_QUERY), self.config.limit)
                    .await?;
                Ok(aggregate_incidents(&rows))
            }
            Dataset::ServiceRequests => {
                let table = self
                    .table("service_requests")
                    .ok_or_else(|| self.unconfigured("service_requests"))?;
                let rows = self
                    .fetch_table(table, REQUEST_FIELDS, Some(REQUEST_QUERY), self.config.limit)
                    .await?;
                Ok(aggregate_service_requests(&rows))
            }
            Dataset::SystemHealth => {
                let table = self
                    .table("system_health")
                    .ok_or_else(|| self.unconfigured("system_health"))?;
                let rows = self.fetch_table(table, HEALTH_FIELDS, None, HEALTH_LIMIT).await?;
                Ok(aggregate_system_health(&rows))
            }
            Dataset::Custom(name) => {
                let custom = self
                    .custom_metrics
                    .get(name)
                    .ok_or_else(|| self.unconfigured(&format!("custom metric {name}")))?;
                let fields: Vec<&str> = custom.fields.iter().map(String::as_str).collect();
                let rows = self
                    .fetch_table(&custom.table, &fields, custom.query.as_deref(), CUSTOM_LIMIT)
                    .await?;
                let mut values = BTreeMap::new();
                values.insert(format!("custom.{name}.count"), MetricValue::from(rows.len() as u64));
                Ok(values)
            }
        }
    }

    fn unconfigured(&self, what: &str) -> DashboardError {
        DashboardError::source_error(&self.name, format!("no table configured for {what}"))
    }
}

#[async_trait]
impl DataSource for ServiceNowSource {
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

        let table = self.table("incidents").unwrap_or("incident").to_string();
        match self.fetch_table(&table, &["number"], None, 1).await {
            Ok(_) => {
                info!("Connected to ServiceNow instance {}", self.base_url);
                self.state = SourceState::Connected;
                Ok(true)
            }
            Err(DashboardError::Http(e)) if e.is_status() => {
                warn!("ServiceNow instance {} rejected the connection check: {}", self.base_url, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_data(&self, metrics: &[String]) -> Result<HashMap<String, DataPoint>> {
        if self.state == SourceState::Shutdown {
            return Err(DashboardError::source_error(&self.name, "source was shut down"));
        }

        let datasets: BTreeSet<Dataset> = metrics
            .iter()
            .filter_map(|m| Dataset::of(local_metric_name(&self.name, m)))
            .collect();
        if datasets.is_empty() {
            return Ok(HashMap::new());
        }

        let results = join_all(datasets.iter().map(|dataset| self.fetch_dataset(dataset))).await;

        let mut values = BTreeMap::new();
        let mut first_error = None;
        let mut any_success = false;
        for (dataset, result) in datasets.iter().zip(results) {
            match result {
                Ok(dataset_values) => {
                    any_success = true;
                    values.extend(dataset_values);
                }
                Err(e) => {
                    warn!("ServiceNow dataset {:?} failed: {}", dataset, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if !any_success {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(metrics
            .iter()
            .filter_map(|metric| {
                let value = values.get(local_metric_name(&self.name, metric))?;
                Some((
                    metric.clone(),
                    DataPoint::new(&self.name, metric, value.clone()),
                ))
            })
            .collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state = SourceState::Shutdown;
        Ok(())
    }

    fn available_metrics(&self) -> BTreeSet<String> {
        let mut metrics = BTreeSet::new();
        let groups = [
            ("incidents", INCIDENT_METRICS),
            ("service_requests", REQUEST_METRICS),
            ("system_health", HEALTH_METRICS),
        ];
        for (group, names) in groups {
            if self.table(group).is_some() {
                metrics.extend(names.iter().map(|n| format!("{group}.{n}")));
            }
        }
        metrics.extend(
            self.custom_metrics
                .keys()
                .map(|name| format!("custom.{name}.count")),
        );
        metrics
    }
}

/// Text of a field; reference fields use their display value.
fn field_text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj
            .get("display_value")
            .or_else(|| obj.get("value"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn priority_label(record: &Record) -> String {
    match field_text(record, "priority") {
        Some(p) if p.chars().all(|c| c.is_ascii_digit()) => format!("P{p}"),
        Some(p) => p,
        None => "Unknown".to_string(),
    }
}

fn count_by<F>(records: &[Record], key: F) -> BTreeMap<String, f64>
where
    F: Fn(&Record) -> String,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(key(record)).or_insert(0.0) += 1.0;
    }
    counts
}

fn assignment_group(record: &Record) -> String {
    field_text(record, "assignment_group").unwrap_or_else(|| "Unassigned".to_string())
}

/// Incident counters: totals, P1/P2 open count, resolution rate and breakdowns.
pub fn aggregate_incidents(records: &[Record]) -> BTreeMap<String, MetricValue> {
    let state = |r: &Record| field_text(r, "state").unwrap_or_else(|| "Unknown".to_string());
    let is_open = |r: &Record| !matches!(state(r).as_str(), "6" | "7");

    let total = records.len() as u64;
    let open = records.iter().filter(|r| is_open(r)).count() as u64;
    let resolved = records.iter().filter(|r| state(r) == "6").count() as u64;
    let critical = records
        .iter()
        .filter(|r| is_open(r) && matches!(priority_label(r).as_str(), "P1" | "P2"))
        .count() as u64;
    let resolution_rate = if total > 0 {
        ((resolved as f64 / total as f64) * 1000.0).round() / 10.0
    } else {
        0.0
    };

    let mut values = BTreeMap::new();
    values.insert("incidents.total".to_string(), MetricValue::from(total));
    values.insert("incidents.open".to_string(), MetricValue::from(open));
    values.insert("incidents.critical".to_string(), MetricValue::from(critical));
    values.insert(
        "incidents.resolution_rate".to_string(),
        MetricValue::from(resolution_rate),
    );
    values.insert(
        "incidents.by_priority".to_string(),
        MetricValue::Map(count_by(records, priority_label)),
    );
    values.insert(
        "incidents.by_state".to_string(),
        MetricValue::Map(count_by(records, state)),
    );
    values.insert(
        "incidents.by_assignment_group".to_string(),
        MetricValue::Map(count_by(records, assignment_group)),
    );
    values
}

/// Service request counters.
pub fn aggregate_service_requests(records: &[Record]) -> BTreeMap<String, MetricValue> {
    let state = |r: &Record| field_text(r, "state").unwrap_or_else(|| "Unknown".to_string());

    let mut values = BTreeMap::new();
    values.insert(
        "service_requests.total".to_string(),
        MetricValue::from(records.len() as u64),
    );
    values.insert(
        "service_requests.by_state".to_string(),
        MetricValue::Map(count_by(records, state)),
    );
    values.insert(
        "service_requests.by_assignment_group".to_string(),
        MetricValue::Map(count_by(records, assignment_group)),
    );
    values
}

/// System health counters. An empty table counts as fully healthy.
pub fn aggregate_system_health(records: &[Record]) -> BTreeMap<String, MetricValue> {
    let status = |r: &Record| {
        field_text(r, "status")
            .unwrap_or_else(|| "unknown".to_string())
            .to_lowercase()
    };

    let total = records.len() as u64;
    let healthy = records
        .iter()
        .filter(|r| HEALTHY_STATUSES.contains(&status(r).as_str()))
        .count() as u64;
    let percentage = if total > 0 { healthy * 100 / total } else { 100 };

    let mut values = BTreeMap::new();
    values.insert("system_health.total_systems".to_string(), MetricValue::from(total));
    values.insert("system_health.healthy_systems".to_string(), MetricValue::from(healthy));
    values.insert("system_health.percentage".to_string(), MetricValue::from(percentage));
    values.insert(
        "system_health.by_status".to_string(),
        MetricValue::Map(count_by(records, status)),
    );
    values
}
