//! Typed dashboard configuration.
//!
//! Configuration is assembled once at startup from several layers, later
//! layers overriding earlier ones key by key:
//!
//! 1. built-in defaults
//! 2. `<dir>/base.yaml`
//! 3. `<dir>/<environment>.yaml`
//! 4. `<dir>/user.yaml`
//! 5. `DASHBOARD_*` environment variables, nested with `__`
//!    (`DASHBOARD_DISPLAY__ROTATION_TIME=15`)
//!
//! The result is validated before any component sees it.

use crate::alerts::AlertRule;
use crate::display::web::WebConfig;
use crate::display::DisplayBackend;
use crate::error::{DashboardError, Result};
use crate::metrics::data::MetricValue;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the configuration environment.
pub const ENV_VAR: &str = "DASHBOARD_ENV";

/// Prefix of configuration override variables.
pub const ENV_PREFIX: &str = "DASHBOARD_";

/// Environment used when neither the CLI nor `DASHBOARD_ENV` names one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Complete dashboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Display and rotation settings
    pub display: DisplayConfig,
    /// Per-screen overrides keyed by screen name
    pub screens: BTreeMap<String, ScreenConfig>,
    /// Alert thresholds and rules
    pub alerts: AlertsConfig,
    /// Enabled data sources and cache policy
    pub data_sources: DataSourcesConfig,
    /// Extra ITSM tables counted as `custom.<name>.count`
    pub custom_metrics: BTreeMap<String, CustomMetricConfig>,
    /// Logging defaults for the binary
    pub logging: LoggingConfig,
}

/// Display and rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Screen names in rotation order
    pub screens: Vec<String>,
    /// Seconds per screen absent a per-screen `duration`
    pub rotation_time: u64,
    /// Pause between dispatch loop ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Which display backend renders the screens
    pub backend: DisplayBackend,
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Whether the terminal display clears before each frame
    pub clear_screen: bool,
    /// Web display settings
    pub web: WebConfig,
    /// Frame dump settings
    pub dump: DumpConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screens: vec!["incident_summary".to_string()],
            rotation_time: crate::DEFAULT_ROTATION_SECS,
            tick_interval_ms: crate::DEFAULT_TICK_INTERVAL_MS,
            backend: DisplayBackend::Terminal,
            width: 64,
            height: 32,
            clear_screen: true,
            web: WebConfig::default(),
            dump: DumpConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Pause between dispatch loop ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Frame dump settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Directory receiving `frames.jsonl`
    pub out_dir: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("frames"),
        }
    }
}

/// Per-screen overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Seconds this screen stays visible
    pub duration: Option<u64>,
    /// Refresh hint passed along to displays, in seconds
    pub refresh_rate: Option<u32>,
}

/// Alert thresholds and rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Thresholds of the two built-in rules
    pub thresholds: Thresholds,
    /// Re-raise continuously active alerts on every tick
    pub resurface_active: bool,
    /// Additional rules; a rule reusing a built-in key replaces it
    pub rules: Vec<AlertRule>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            resurface_active: true,
            rules: Vec::new(),
        }
    }
}

/// Thresholds of the built-in alert rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Critical alert when `incidents.critical` reaches this count
    pub critical_incidents: f64,
    /// Warning when `system_health.percentage` drops below this value
    pub system_health: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_incidents: 5.0,
            system_health: 90.0,
        }
    }
}

/// Enabled data sources and cache policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourcesConfig {
    /// Source names to instantiate
    pub enabled: Vec<String>,
    /// Source receiving every metric; when unset and only one source is
    /// enabled, that source is the default, otherwise metrics go to the source
    /// named by their first dot-separated segment, else to `mock`. Required
    /// when several sources are enabled and `mock` is not one of them
    pub default: Option<String>,
    /// Seconds a fetched metric stays fresh
    pub cache_ttl: u64,
    /// TTL overrides keyed by metric prefix
    pub ttl_overrides: HashMap<String, u64>,
    /// Mock generator settings
    pub mock: MockConfig,
    /// ServiceNow connection, required when `servicenow` is enabled
    pub servicenow: Option<ServiceNowConfig>,
}

impl Default for DataSourcesConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["mock".to_string()],
            default: None,
            cache_ttl: crate::DEFAULT_CACHE_TTL_SECS,
            ttl_overrides: HashMap::new(),
            mock: MockConfig::default(),
            servicenow: None,
        }
    }
}

/// Mock generator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Seed for reproducible values
    pub seed: Option<u64>,
    /// Fixed values that replace the generated ones
    pub values: HashMap<String, MetricValue>,
}

/// ServiceNow Table API connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNowConfig {
    /// Instance root, e.g. `https://example.service-now.com`
    pub instance_url: String,
    pub username: String,
    pub password: String,
    /// Verify the instance TLS certificate
    pub verify_ssl: bool,
    /// Request timeout in seconds
    pub timeout: u64,
    /// `sysparm_limit` for the standard tables
    pub limit: u32,
    /// Table names keyed by dataset (`incidents`, `service_requests`, `system_health`)
    pub tables: BTreeMap<String, String>,
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert("incidents".to_string(), "incident".to_string());
        tables.insert("service_requests".to_string(), "sc_request".to_string());

        Self {
            instance_url: String::new(),
            username: String::new(),
            password: String::new(),
            verify_ssl: true,
            timeout: 30,
            limit: 100,
            tables,
        }
    }
}

impl fmt::Debug for ServiceNowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceNowConfig")
            .field("instance_url", &self.instance_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout", &self.timeout)
            .field("limit", &self.limit)
            .field("tables", &self.tables)
            .finish()
    }
}

impl ServiceNowConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// An extra table counted as a custom metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMetricConfig {
    pub table: String,
    /// Encoded query (`sysparm_query`)
    pub query: Option<String>,
    pub fields: Vec<String>,
}

impl Default for CustomMetricConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            query: None,
            fields: vec![
                "number".to_string(),
                "state".to_string(),
                "short_description".to_string(),
            ],
        }
    }
}

/// Logging defaults for the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Pick the configuration environment: CLI flag, then `DASHBOARD_ENV`, then
/// [`DEFAULT_ENVIRONMENT`].
pub fn resolve_environment(cli: Option<&str>) -> String {
    cli.map(str::to_string)
        .or_else(|| std::env::var(ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

impl DashboardConfig {
    /// Load the layered configuration from `config_dir` for `environment`.
    ///
    /// `base.yaml` must exist; the environment and user files are optional.
    pub fn load(config_dir: impl AsRef<Path>, environment: &str) -> Result<Self> {
        let dir = config_dir.as_ref();
        let base = dir.join("base.yaml");
        if !base.is_file() {
            return Err(DashboardError::config_error(format!(
                "missing base configuration {}",
                base.display()
            )));
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(base))
            .merge(Yaml::file(dir.join(format!("{environment}.yaml"))))
            .merge(Yaml::file(dir.join("user.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    /// Built-in defaults plus `DASHBOARD_*` overrides, for running without a
    /// configuration directory.
    pub fn load_defaults() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    /// Parse a single YAML document layered over the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::string(yaml));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields the dashboard cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.display.screens.is_empty() {
            return Err(DashboardError::config_error("display.screens is empty"));
        }
        if self.display.rotation_time == 0 {
            return Err(DashboardError::config_error(
                "display.rotation_time must be at least 1 second",
            ));
        }
        if self.display.tick_interval_ms == 0 {
            return Err(DashboardError::config_error(
                "display.tick_interval_ms must be positive",
            ));
        }
        if self.data_sources.enabled.is_empty() {
            return Err(DashboardError::config_error("data_sources.enabled is empty"));
        }
        match &self.data_sources.default {
            Some(default) if !self.data_sources.enabled.contains(default) => {
                return Err(DashboardError::config_error(format!(
                    "data_sources.default '{default}' is not enabled"
                )));
            }
            // without a default only mock catches metrics no source is named after
            None if self.data_sources.enabled.len() > 1
                && !self.data_sources.enabled.iter().any(|s| s == "mock") =>
            {
                return Err(DashboardError::config_error(
                    "data_sources.default is required when several sources are enabled",
                ));
            }
            _ => {}
        }
        if self.data_sources.enabled.iter().any(|s| s == "servicenow") {
            match &self.data_sources.servicenow {
                Some(sn) if !sn.instance_url.is_empty() => {}
                _ => {
                    return Err(DashboardError::config_error(
                        "data_sources.servicenow.instance_url is required when servicenow is enabled",
                    ))
                }
            }
        }
        for (name, metric) in &self.custom_metrics {
            if metric.table.is_empty() {
                return Err(DashboardError::config_error(format!(
                    "custom metric '{name}' is missing its table"
                )));
            }
        }
        Ok(())
    }

    /// How long `screen` stays visible.
    pub fn screen_duration(&self, screen: &str) -> Duration {
        let secs = self
            .screens
            .get(screen)
            .and_then(|s| s.duration)
            .unwrap_or(self.display.rotation_time);
        Duration::from_secs(secs)
    }

    /// Refresh hint for `screen`.
    pub fn screen_refresh_rate(&self, screen: &str) -> u32 {
        self.screens
            .get(screen)
            .and_then(|s| s.refresh_rate)
            .unwrap_or(crate::metrics::data::DEFAULT_REFRESH_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.display.rotation_time, 10);
        assert_eq!(config.data_sources.enabled, vec!["mock"]);
        assert_eq!(config.alerts.thresholds.critical_incidents, 5.0);
        assert_eq!(config.alerts.thresholds.system_health, 90.0);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = DashboardConfig::from_yaml_str(
            r#"
display:
  screens: [incident_summary, system_health]
  rotation_time: 15
screens:
  system_health:
    duration: 5
data_sources:
  ttl_overrides:
    incidents: 30
"#,
        )
        .unwrap();

        assert_eq!(config.display.screens.len(), 2);
        assert_eq!(config.screen_duration("incident_summary"), Duration::from_secs(15));
        assert_eq!(config.screen_duration("system_health"), Duration::from_secs(5));
        assert_eq!(config.data_sources.ttl_overrides.get("incidents"), Some(&30));
        // untouched sections keep their defaults
        assert_eq!(config.display.tick_interval_ms, 100);
    }

    #[test]
    fn test_empty_screens_rejected() {
        let result = DashboardConfig::from_yaml_str("display:\n  screens: []\n");
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_servicenow_requires_instance() {
        let result = DashboardConfig::from_yaml_str("data_sources:\n  enabled: [servicenow]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_several_sources_need_a_default() {
        let servicenow = "  servicenow:\n    instance_url: https://example.service-now.com\n";

        let without_mock = format!("data_sources:\n  enabled: [servicenow, jira]\n{servicenow}");
        assert!(matches!(
            DashboardConfig::from_yaml_str(&without_mock),
            Err(DashboardError::Config(_))
        ));

        let with_default = format!(
            "data_sources:\n  enabled: [servicenow, jira]\n  default: servicenow\n{servicenow}"
        );
        assert!(DashboardConfig::from_yaml_str(&with_default).is_ok());

        // mock picks up whatever no source is named after
        let with_mock = format!("data_sources:\n  enabled: [mock, servicenow]\n{servicenow}");
        assert!(DashboardConfig::from_yaml_str(&with_mock).is_ok());
    }

    #[test]
    fn test_custom_metric_requires_table() {
        let result = DashboardConfig::from_yaml_str(
            "custom_metrics:\n  changes:\n    query: active=true\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_layered_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "display:\n  rotation_time: 20\n  screens: [incident_summary]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("production.yaml"),
            "display:\n  rotation_time: 30\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.yaml"),
            "alerts:\n  thresholds:\n    critical_incidents: 3\n",
        )
        .unwrap();

        let config = DashboardConfig::load(dir.path(), "production").unwrap();
        assert_eq!(config.display.rotation_time, 30);
        assert_eq!(config.display.screens, vec!["incident_summary"]);
        assert_eq!(config.alerts.thresholds.critical_incidents, 3.0);

        // A missing environment file is fine
        let config = DashboardConfig::load(dir.path(), "staging").unwrap();
        assert_eq!(config.display.rotation_time, 20);
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DashboardConfig::load(dir.path(), "development").is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let config = ServiceNowConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_resolve_environment_prefers_cli() {
        assert_eq!(resolve_environment(Some("production")), "production");
    }
}
