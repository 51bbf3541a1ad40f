//! Monitored service health.

use super::{format_count, metric_set, number, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::metrics::data::{Color, ScreenData, Section, Snapshot, PLACEHOLDER};
use std::collections::BTreeSet;
use std::time::Duration;

const PERCENTAGE: &str = "system_health.percentage";
const TOTAL: &str = "system_health.total_systems";
const HEALTHY: &str = "system_health.healthy_systems";

const HEALTHY_AT: f64 = 95.0;
const DEGRADED_AT: f64 = 85.0;

#[derive(Debug, Clone)]
pub struct SystemHealthScreen {
    settings: ScreenSettings,
}

impl SystemHealthScreen {
    pub const NAME: &'static str = "system_health";

    pub fn new(settings: ScreenSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(ScreenSettings::from_config(config, Self::NAME))
    }
}

fn status(percentage: f64) -> (&'static str, Color) {
    if percentage >= HEALTHY_AT {
        ("healthy", Color::Green)
    } else if percentage >= DEGRADED_AT {
        ("degraded", Color::Yellow)
    } else {
        ("critical", Color::Red)
    }
}

impl Screen for SystemHealthScreen {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[PERCENTAGE, TOTAL, HEALTHY])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let percentage = number(snapshot, PERCENTAGE);
        let total = number(snapshot, TOTAL);
        let healthy = number(snapshot, HEALTHY);
        let down = (total - healthy).max(0.0);

        // no reading is not the same as a 0% reading
        let (label, color) = if snapshot.contains_key(PERCENTAGE) {
            status(percentage)
        } else {
            (PLACEHOLDER, Color::White)
        };
        let down_color = if down > 0.0 { Color::Red } else { Color::White };

        ScreenData::new("System Health")
            .with_field("percentage", percentage)
            .with_field("total_systems", total)
            .with_field("healthy_systems", healthy)
            .with_field("down", down)
            .with_field("status", label)
            .with_section(Section::title("HEALTH", Color::White))
            .with_section(Section::metric(
                "Health",
                format!("{}%", format_count(percentage)),
                color,
            ))
            .with_section(Section::metric("Up", format_count(healthy), Color::Green))
            .with_section(Section::metric("Down", format_count(down), down_color))
            .with_refresh_rate(self.settings.refresh_rate)
    }

    fn display_duration(&self) -> Duration {
        self.settings.duration
    }
}
