//! Helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use itsm_board::config::DisplayConfig;
use itsm_board::{DashboardConfig, Display, MetricValue, Result, ScreenData};
use std::sync::{Arc, Mutex};

/// Display that keeps every rendered frame in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingDisplay {
    frames: Arc<Mutex<Vec<ScreenData>>>,
    shut_down: Arc<Mutex<bool>>,
}

impl RecordingDisplay {
    pub fn frames(&self) -> Vec<ScreenData> {
        self.frames.lock().unwrap().clone()
    }

    pub fn was_shut_down(&self) -> bool {
        *self.shut_down.lock().unwrap()
    }
}

#[async_trait]
impl Display for RecordingDisplay {
    fn name(&self) -> &str {
        "recording"
    }

    async fn initialize(&mut self, _config: &DisplayConfig) -> Result<bool> {
        Ok(true)
    }

    async fn render(&mut self, screen: &ScreenData) -> Result<()> {
        self.frames.lock().unwrap().push(screen.clone());
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        *self.shut_down.lock().unwrap() = true;
        Ok(())
    }
}

/// Two-screen rotation over the mock source with fixed incident and health values.
pub fn scenario_config() -> DashboardConfig {
    let mut config = DashboardConfig::from_yaml_str(
        r#"
display:
  screens: [incident_summary, system_health]
  rotation_time: 10
  tick_interval_ms: 10
data_sources:
  enabled: [mock]
  mock:
    seed: 7
"#,
    )
    .unwrap();

    let values = &mut config.data_sources.mock.values;
    values.insert("incidents.total".to_string(), MetricValue::Number(42.0));
    values.insert("incidents.critical".to_string(), MetricValue::Number(5.0));
    values.insert("system_health.percentage".to_string(), MetricValue::Number(80.0));
    config
}
