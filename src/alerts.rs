//! Threshold alerts with clear-on-recovery.
//!
//! The evaluator is stateless: callers pass in the alerts active before the
//! tick and receive the alerts active after it, plus the ones to surface on
//! the current screen. Each rule owns one key, so at most one alert per key
//! is ever active.

use crate::config::AlertsConfig;
use crate::metrics::data::{Alert, AlertLevel, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Active alerts keyed by rule key.
pub type ActiveAlerts = BTreeMap<String, Alert>;

/// How a metric is compared against a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Triggers when `value >= threshold`
    AtLeast,
    /// Triggers when `value < threshold`
    Below,
}

impl Comparison {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtLeast => value >= threshold,
            Comparison::Below => value < threshold,
        }
    }
}

/// A single threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Alert key; reusing a built-in key replaces that rule
    pub key: String,
    /// Metric the rule watches
    pub metric: String,
    pub comparison: Comparison,
    pub threshold: f64,
    pub level: AlertLevel,
    /// Message template; `{value}` and `{threshold}` are substituted
    pub message: String,
    /// Reported alert source, defaults to the metric's first segment
    #[serde(default)]
    pub source: Option<String>,
}

impl AlertRule {
    pub const CRITICAL_INCIDENTS: &'static str = "critical_incidents";
    pub const SYSTEM_HEALTH: &'static str = "system_health";

    /// Critical alert while `incidents.critical` is at or above `threshold`.
    pub fn critical_incidents(threshold: f64) -> Self {
        Self {
            key: Self::CRITICAL_INCIDENTS.to_string(),
            metric: "incidents.critical".to_string(),
            comparison: Comparison::AtLeast,
            threshold,
            level: AlertLevel::Critical,
            message: "{value} critical incidents".to_string(),
            source: None,
        }
    }

    /// Warning while `system_health.percentage` is below `threshold`.
    pub fn system_health(threshold: f64) -> Self {
        Self {
            key: Self::SYSTEM_HEALTH.to_string(),
            metric: "system_health.percentage".to_string(),
            comparison: Comparison::Below,
            threshold,
            level: AlertLevel::Warning,
            message: "System health at {value}%".to_string(),
            source: None,
        }
    }

    fn source(&self) -> &str {
        self.source
            .as_deref()
            .unwrap_or_else(|| self.metric.split('.').next().unwrap_or(&self.metric))
    }

    fn render_message(&self, value: f64) -> String {
        self.message
            .replace("{value}", &format_number(value))
            .replace("{threshold}", &format_number(self.threshold))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertEvaluation {
    /// Alerts active after this tick
    pub active: ActiveAlerts,
    /// Alerts to attach to the current screen
    pub raised: Vec<Alert>,
}

/// Evaluates threshold rules against metric snapshots.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    rules: Vec<AlertRule>,
    resurface_active: bool,
}

impl AlertEvaluator {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self {
            rules,
            resurface_active: true,
        }
    }

    /// Built-in rules with the configured thresholds, plus configured rules.
    /// A configured rule with a built-in key takes that rule's place.
    pub fn from_config(config: &AlertsConfig) -> Self {
        let mut rules = vec![
            AlertRule::critical_incidents(config.thresholds.critical_incidents),
            AlertRule::system_health(config.thresholds.system_health),
        ];
        for rule in &config.rules {
            match rules.iter_mut().find(|r| r.key == rule.key) {
                Some(existing) => *existing = rule.clone(),
                None => rules.push(rule.clone()),
            }
        }

        Self::new(rules).with_resurface(config.resurface_active)
    }

    /// Whether alerts that stay active are raised again on every tick.
    pub fn with_resurface(mut self, resurface_active: bool) -> Self {
        self.resurface_active = resurface_active;
        self
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Evaluate every rule against `snapshot`.
    ///
    /// A rule whose metric is missing (or not numeric) keeps its previous
    /// state and raises nothing. An alert that stays active keeps the
    /// timestamp of when it was first raised.
    pub fn evaluate(&self, snapshot: &Snapshot, previous: &ActiveAlerts) -> AlertEvaluation {
        let mut evaluation = AlertEvaluation {
            active: previous.clone(),
            raised: Vec::new(),
        };

        for rule in &self.rules {
            let Some(value) = snapshot.get(&rule.metric).and_then(|p| p.value.as_f64()) else {
                continue;
            };

            if rule.comparison.holds(value, rule.threshold) {
                let mut alert = Alert::new(
                    rule.key.clone(),
                    rule.level,
                    rule.render_message(value),
                    rule.source(),
                );
                let newly_active = match previous.get(&rule.key) {
                    Some(prior) => {
                        alert.timestamp = prior.timestamp;
                        false
                    }
                    None => {
                        info!("Alert {} raised: {}", rule.key, alert.message);
                        true
                    }
                };

                if newly_active || self.resurface_active {
                    evaluation.raised.push(alert.clone());
                }
                evaluation.active.insert(rule.key.clone(), alert);
            } else if evaluation.active.remove(&rule.key).is_some() {
                info!("Alert {} cleared ({} = {})", rule.key, rule.metric, value);
            } else {
                debug!("Rule {} quiet ({} = {})", rule.key, rule.metric, value);
            }
        }

        evaluation
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::from_config(&AlertsConfig::default())
    }
}
