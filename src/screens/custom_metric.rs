//! Screens for configured custom metrics.
//!
//! Every entry under `custom_metrics` becomes a screen named
//! `custom_<name>` showing the row count of its table.

use super::{format_count, metric_set, number, updated_at, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::metrics::data::{Color, ScreenData, Section, Snapshot};
use std::collections::BTreeSet;
use std::time::Duration;

/// Prefix turning a custom metric name into a screen name.
pub const SCREEN_PREFIX: &str = "custom_";

#[derive(Debug, Clone)]
pub struct CustomMetricScreen {
    name: String,
    label: String,
    metric: String,
    settings: ScreenSettings,
}

impl CustomMetricScreen {
    pub fn new(metric_name: &str, settings: ScreenSettings) -> Self {
        Self {
            name: format!("{SCREEN_PREFIX}{metric_name}"),
            label: metric_name.replace('_', " ").to_uppercase(),
            metric: format!("custom.{metric_name}.count"),
            settings,
        }
    }

    /// Build the screen `custom_<name>`; `<name>` must be a configured custom metric.
    pub fn from_config(screen_name: &str, config: &DashboardConfig) -> Result<Self> {
        let metric_name = screen_name
            .strip_prefix(SCREEN_PREFIX)
            .filter(|name| config.custom_metrics.contains_key(*name))
            .ok_or_else(|| DashboardError::unknown_screen(screen_name))?;

        Ok(Self::new(
            metric_name,
            ScreenSettings::from_config(config, screen_name),
        ))
    }
}

impl Screen for CustomMetricScreen {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[self.metric.as_str()])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let count = number(snapshot, &self.metric);
        let updated = updated_at(snapshot, &self.metric);

        ScreenData::new(self.label.clone())
            .with_field("count", count)
            .with_field("updated", updated.clone())
            .with_section(Section::title(self.label.clone(), Color::Blue))
            .with_section(Section::metric("Count", format_count(count), Color::White))
            .with_section(Section::text(updated, Color::White))
            .with_refresh_rate(self.settings.refresh_rate)
    }

    fn display_duration(&self) -> Duration {
        self.settings.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{DataPoint, PLACEHOLDER};

    fn config() -> DashboardConfig {
        DashboardConfig::from_yaml_str(
            "custom_metrics:\n  open_changes:\n    table: change_request\nscreens:\n  custom_open_changes:\n    duration: 3\n",
        )
        .unwrap()
    }

    #[test]
    fn test_from_config() {
        let screen = CustomMetricScreen::from_config("custom_open_changes", &config()).unwrap();
        assert_eq!(screen.name(), "custom_open_changes");
        assert_eq!(screen.display_duration(), Duration::from_secs(3));
        assert!(screen
            .required_metrics()
            .contains("custom.open_changes.count"));
    }

    #[test]
    fn test_unknown_custom_metric() {
        assert!(CustomMetricScreen::from_config("custom_nothing", &config()).is_err());
        assert!(CustomMetricScreen::from_config("open_changes", &config()).is_err());
    }

    #[test]
    fn test_process() {
        let screen = CustomMetricScreen::new("open_changes", ScreenSettings::default());
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "custom.open_changes.count".to_string(),
            DataPoint::new("mock", "custom.open_changes.count", 7.0),
        );

        let data = screen.process(&snapshot);
        assert_eq!(data.title, "OPEN CHANGES");
        assert_eq!(data.number("count"), Some(7.0));

        let empty = screen.process(&Snapshot::new());
        assert_eq!(empty.number("count"), Some(0.0));
        assert_eq!(empty.text("updated"), Some(PLACEHOLDER));
    }
}
