//! Busiest assignment groups.

use super::{breakdown, format_count, metric_set, ranked, Screen, ScreenSettings};
use crate::config::DashboardConfig;
use crate::metrics::data::{Color, ScreenData, Section, Snapshot, PLACEHOLDER};
use std::collections::BTreeSet;
use std::time::Duration;

const BY_GROUP: &str = "incidents.by_assignment_group";

const MAX_GROUPS: usize = 4;

/// Group names longer than this are cut to fit the panel
const NAME_WIDTH: usize = 10;

#[derive(Debug, Clone)]
pub struct AssignmentGroupsScreen {
    settings: ScreenSettings,
}

impl AssignmentGroupsScreen {
    pub const NAME: &'static str = "assignment_groups";

    pub fn new(settings: ScreenSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(ScreenSettings::from_config(config, Self::NAME))
    }
}

fn short_name(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}

impl Screen for AssignmentGroupsScreen {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        metric_set(&[BY_GROUP])
    }

    fn process(&self, snapshot: &Snapshot) -> ScreenData {
        let groups = breakdown(snapshot, BY_GROUP);
        let top = ranked(&groups);

        let (top_group, top_count) = top
            .first()
            .map(|(name, count)| (name.to_string(), *count))
            .unwrap_or_else(|| (PLACEHOLDER.to_string(), 0.0));

        let mut data = ScreenData::new("Assignment Groups")
            .with_field("groups", groups.len() as u64)
            .with_field("top_group", top_group)
            .with_field("top_group_count", top_count)
            .with_section(Section::title("GROUPS", Color::White));

        for (name, count) in top.into_iter().take(MAX_GROUPS) {
            let color = if count > 0.0 { Color::White } else { Color::Blue };
            data = data.with_section(Section::metric(short_name(name), format_count(count), color));
        }

        data.with_refresh_rate(self.settings.refresh_rate)
    }

    fn display_duration(&self) -> Duration {
        self.settings.duration
    }
}
