//! Open service requests and their states.

use super::{breakdown, format_count, metric_set, number, ranked, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::metrics::data::{Color, ScreenData, Section, Snapshot, PLACEHOLDER};
use std::collections::BTreeSet;
use std::time::Duration;

const TOTAL: &str = "service_requests.total";
const BY_STATE: &str = "service_requests.by_state";

/// States listed below the total
const MAX_STATES: usize = 3;

#[derive(Debug, Clone)]
pub struct ServiceRequestsScreen {
    settings: ScreenSettings,
}

impl ServiceRequestsScreen {
    pub const NAME: &'static str = "service_requests";

    pub fn new(settings: ScreenSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(ScreenSettings::from_config(config, Self::NAME))
    }
}

impl Screen for ServiceRequestsScreen {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[TOTAL, BY_STATE])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let total = number(snapshot, TOTAL);
        let states = breakdown(snapshot, BY_STATE);
        let ranked_states = ranked(&states);
        let busiest = ranked_states
            .first()
            .map(|(state, _)| state.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let mut data = ScreenData::new("Service Requests")
            .with_field("total", total)
            .with_field("busiest_state", busiest)
            .with_section(Section::title("REQUESTS", Color::White))
            .with_section(Section::metric("Total", format_count(total), Color::White));

        for (state, count) in ranked_states.into_iter().take(MAX_STATES) {
            let color = if state.to_lowercase().contains("pending") && count > 0.0 {
                Color::Yellow
            } else {
                Color::White
            };
            data = data.with_section(Section::metric(state, format_count(count), color));
        }

        data.with_refresh_rate(self.settings.refresh_rate)
    }

    fn display_duration(&self) -> Duration {
        self.settings.duration
    }
}
