//! Incident counts per priority as bars.

use super::{breakdown, format_count, metric_set, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::metrics::data::{Color, ScreenData, Section, Snapshot, PLACEHOLDER};
use std::collections::BTreeSet;
use std::time::Duration;

const BY_PRIORITY: &str = "incidents.by_priority";

const PRIORITIES: [(&str, Color); 4] = [
    ("P1", Color::Red),
    ("P2", Color::Yellow),
    ("P3", Color::Blue),
    ("P4", Color::Green),
];

#[derive(Debug, Clone)]
pub struct PriorityBreakdownScreen {
    settings: ScreenSettings,
}

impl PriorityBreakdownScreen {
    pub const NAME: &'static str = "priority_breakdown";

    pub fn new(settings: ScreenSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(ScreenSettings::from_config(config, Self::NAME))
    }
}

impl Screen for PriorityBreakdownScreen {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[BY_PRIORITY])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let counts = breakdown(snapshot, BY_PRIORITY);
        let count = |label: &str| counts.get(label).copied().unwrap_or(0.0);
        let max = PRIORITIES
            .iter()
            .map(|(label, _)| count(*label))
            .fold(1.0_f64, f64::max);

        // highest priority that has any incidents
        let top = PRIORITIES
            .iter()
            .find(|(label, _)| count(*label) > 0.0)
            .map(|(label, _)| label.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let mut data = ScreenData::new("Priority Breakdown")
            .with_field("top_priority", top)
            .with_section(Section::title("PRIORITY", Color::White));

        for (label, color) in PRIORITIES {
            let value = count(label);
            let color = if value > 0.0 { color } else { Color::White };
            data = data
                .with_field(label.to_lowercase(), value)
                .with_section(Section::bar(
                    format!("{}: {}", label, format_count(value)),
                    value,
                    max,
                    color,
                ));
        }

        data.with_refresh_rate(self.settings.refresh_rate)
    }

    fn display_duration(&self) -> Duration {
        self.settings.duration
    }
}
