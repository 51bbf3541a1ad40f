//! Data structures shared by sources, screens, alerts and displays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Shown in place of a string field whose metric is missing.
pub const PLACEHOLDER: &str = "--";

/// Refresh hint used when a screen has no override, in seconds.
pub const DEFAULT_REFRESH_RATE: u32 = 60;

/// Metrics handed to a screen for one `process` call, keyed by metric name.
pub type Snapshot = HashMap<String, DataPoint>;

/// The value carried by a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A counter, rate or percentage
    Number(f64),
    /// A breakdown such as counts by priority
    Map(BTreeMap<String, f64>),
    /// Free-form text
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value; numeric text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(s) => s.trim().parse().ok(),
            MetricValue::Map(_) => None,
        }
    }

    /// Breakdown view of the value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            MetricValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<BTreeMap<String, f64>> for MetricValue {
    fn from(value: BTreeMap<String, f64>) -> Self {
        MetricValue::Map(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

/// A single metric value produced by a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Name of the source that produced this value
    pub source: String,
    /// Metric name, e.g. `incidents.critical`
    pub metric: String,
    pub value: MetricValue,
    /// When the source produced the value
    pub timestamp: DateTime<Utc>,
    /// Source-specific extras
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl DataPoint {
    /// Create a data point stamped with the current time.
    pub fn new(
        source: impl Into<String>,
        metric: impl Into<String>,
        value: impl Into<MetricValue>,
    ) -> Self {
        Self {
            source: source.into(),
            metric: metric.into(),
            value: value.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Attach source-specific metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// An active threshold violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert-kind key; at most one active alert exists per key
    pub key: String,
    pub level: AlertLevel,
    pub message: String,
    /// Metric group that triggered the alert, e.g. `incidents`
    pub source: String,
    /// When the alert was first raised
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create an alert raised now.
    pub fn new(
        key: impl Into<String>,
        level: AlertLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            level,
            message: message.into(),
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Named display colors understood by every backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    White,
    Red,
    Green,
    Yellow,
    Blue,
}

/// One layout element of a rendered screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    /// Screen heading
    Title { text: String, color: Color },
    /// A labelled value
    Metric {
        label: String,
        value: String,
        color: Color,
    },
    /// A labelled horizontal bar, `value` out of `max`
    Bar {
        label: String,
        value: f64,
        max: f64,
        color: Color,
    },
    /// Free text line
    Text { text: String, color: Color },
}

impl Section {
    pub fn title(text: impl Into<String>, color: Color) -> Self {
        Section::Title {
            text: text.into(),
            color,
        }
    }

    pub fn metric(label: impl Into<String>, value: impl Into<String>, color: Color) -> Self {
        Section::Metric {
            label: label.into(),
            value: value.into(),
            color,
        }
    }

    pub fn bar(label: impl Into<String>, value: f64, max: f64, color: Color) -> Self {
        Section::Bar {
            label: label.into(),
            value,
            max,
            color,
        }
    }

    pub fn text(text: impl Into<String>, color: Color) -> Self {
        Section::Text {
            text: text.into(),
            color,
        }
    }
}

/// Display-ready output of a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenData {
    pub title: String,
    /// Named fields of the screen (numbers default to 0, strings to [`PLACEHOLDER`])
    pub data: Map<String, Value>,
    /// Layout consumed by displays
    pub sections: Vec<Section>,
    pub alerts: Vec<Alert>,
    /// Refresh hint in seconds
    pub refresh_rate: u32,
}

impl ScreenData {
    /// Create an empty screen with the default refresh rate.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: Map::new(),
            sections: Vec::new(),
            alerts: Vec::new(),
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }

    /// Minimal screen shown in place of a screen that failed to process.
    pub fn error(screen: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new("Screen Error")
            .with_field("screen", screen)
            .with_field("error", message.clone())
            .with_section(Section::title("ERROR", Color::Red))
            .with_section(Section::text(screen, Color::White))
            .with_section(Section::text(message, Color::Yellow))
    }

    /// Set a named field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Append a layout section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_refresh_rate(mut self, refresh_rate: u32) -> Self {
        self.refresh_rate = refresh_rate;
        self
    }

    /// Read a numeric field.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    /// Read a string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Whether an alert of `level` is attached.
    pub fn has_alert(&self, level: AlertLevel) -> bool {
        self.alerts.iter().any(|a| a.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_value_untagged_serde() {
        let number: MetricValue = serde_json::from_str("42").unwrap();
        assert_eq!(number.as_f64(), Some(42.0));

        let map: MetricValue = serde_json::from_str(r#"{"P1": 2, "P2": 3}"#).unwrap();
        assert_eq!(map.as_map().unwrap().get("P2"), Some(&3.0));

        let text: MetricValue = serde_json::from_str(r#""17""#).unwrap();
        assert_eq!(text.as_f64(), Some(17.0));
    }

    #[test]
    fn test_section_tagging() {
        let json = serde_json::to_value(Section::metric("Total", "42", Color::Red)).unwrap();
        assert_eq!(json["type"], "metric");
        assert_eq!(json["color"], "red");
    }

    #[test]
    fn test_error_screen() {
        let screen = ScreenData::error("priority_breakdown", "boom");
        assert_eq!(screen.title, "Screen Error");
        assert_eq!(screen.text("screen"), Some("priority_breakdown"));
        assert!(screen.alerts.is_empty());
    }

    #[test]
    fn test_alert_level_ordering() {
        assert!(AlertLevel::Critical > AlertLevel::Warning);
        assert!(AlertLevel::Warning > AlertLevel::Info);
        assert_eq!(AlertLevel::Critical.to_string(), "critical");
    }
}
