//! Incident counters at a glance.

use super::{format_count, metric_set, number, updated_at, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::metrics::data::{Color, ScreenData, Section, Snapshot};
use std::collections::BTreeSet;
use std::time::Duration;

const TOTAL: &str = "incidents.total";
const CRITICAL: &str = "incidents.critical";
const OPEN: &str = "incidents.open";
const RESOLUTION_RATE: &str = "incidents.resolution_rate";

/// Total, P1/P2, open and resolution rate.
#[derive(Debug, Clone)]
pub struct IncidentSummaryScreen {
    settings: ScreenSettings,
}

impl IncidentSummaryScreen {
    pub const NAME: &'static str = "incident_summary";

    pub fn new(settings: ScreenSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(ScreenSettings::from_config(config, Self::NAME))
    }
}

impl Screen for IncidentSummaryScreen {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[TOTAL, CRITICAL, OPEN, RESOLUTION_RATE])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let total = number(snapshot, TOTAL);
        let critical = number(snapshot, CRITICAL);
        let open = number(snapshot, OPEN);
        let resolution_rate = number(snapshot, RESOLUTION_RATE);
        let updated = updated_at(snapshot, TOTAL);

        let title_color = if critical > 0.0 { Color::Red } else { Color::Green };
        let critical_color = if critical > 0.0 { Color::Red } else { Color::White };

        ScreenData::new("Incident Summary")
            .with_field("total", total)
            .with_field("critical", critical)
            .with_field("open", open)
            .with_field("resolution_rate", resolution_rate)
            .with_field("updated", updated.clone())
            .with_section(Section::title("INCIDENTS", title_color))
            .with_section(Section::metric("Total", format_count(total), Color::White))
            .with_section(Section::metric("P1/P2", format_count(critical), critical_color))
            .with_section(Section::metric("Open", format_count(open), Color::White))
            .with_section(Section::metric(
                "Res",
                format!("{}%", format_count(resolution_rate)),
                Color::White,
            ))
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

    fn snapshot(values: &[(&str, f64)]) -> Snapshot {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), DataPoint::new("mock", *k, *v)))
            .collect()
    }

    #[test]
    fn test_process_values() {
        let screen = IncidentSummaryScreen::new(ScreenSettings::default());
        let data = screen.process(&snapshot(&[
            ("incidents.total", 42.0),
            ("incidents.critical", 5.0),
            ("incidents.open", 20.0),
            ("incidents.resolution_rate", 87.5),
        ]));

        assert_eq!(data.title, "Incident Summary");
        assert_eq!(data.number("total"), Some(42.0));
        assert_eq!(data.number("critical"), Some(5.0));
        assert_ne!(data.text("updated"), Some(PLACEHOLDER));
        assert_eq!(data.sections[0], Section::title("INCIDENTS", Color::Red));
        assert!(data.sections.contains(&Section::metric("Res", "87.5%", Color::White)));
        // screens never raise alerts themselves
        assert!(data.alerts.is_empty());
    }

    #[test]
    fn test_process_empty_snapshot() {
        let screen = IncidentSummaryScreen::new(ScreenSettings::default());
        let data = screen.process(&Snapshot::new());

        assert_eq!(data.number("total"), Some(0.0));
        assert_eq!(data.number("resolution_rate"), Some(0.0));
        assert_eq!(data.text("updated"), Some(PLACEHOLDER));
        assert_eq!(data.sections[0], Section::title("INCIDENTS", Color::Green));
    }

    #[test]
    fn test_required_metrics() {
        let screen = IncidentSummaryScreen::new(ScreenSettings::default());
        let metrics = screen.required_metrics();
        assert_eq!(metrics.len(), 4);
        assert!(metrics.contains("incidents.critical"));
        assert!(!metrics.contains("system_health.percentage"));
    }
}
