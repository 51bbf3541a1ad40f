use async_trait::async_trait;
use itsm_board::display::terminal::render_frame;
use itsm_board::metrics::data::PLACEHOLDER;
use itsm_board::screens::{BoxedScreen, Screen};
use itsm_board::{
    DashboardConfig, DataManager, DataPoint, DataSource, MetricCache, MetricValue,
    PluginRegistry, Result, ScreenData, ScreenRotator, Snapshot, SourceState,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Source counting how often it is asked for data; can be switched to failing.
struct CountingSource {
    calls: Arc<AtomicUsize>,
    failing: Arc<std::sync::atomic::AtomicBool>,
}

#[async_trait]
impl DataSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn state(&self) -> SourceState {
        SourceState::Connected
    }

    async fn connect(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn fetch_data(&self, metrics: &[String]) -> Result<HashMap<String, DataPoint>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(itsm_board::DashboardError::source_error("counting", "offline"));
        }
        Ok(metrics
            .iter()
            .map(|m| (m.clone(), DataPoint::new("counting", m, call as f64)))
            .collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    fn available_metrics(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

struct FixedScreen {
    name: String,
    secs: u64,
}

impl Screen for FixedScreen {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_metrics(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn process(&self, _snapshot: &Snapshot) -> ScreenData {
        ScreenData::new(self.name.clone())
    }

    fn display_duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_every_builtin_screen_handles_empty_snapshot() {
    let config = DashboardConfig::default();
    let registry = PluginRegistry::with_builtins();

    for name in registry.list_screens() {
        let screen = registry.create_screen(&name, &config).unwrap();
        let data = screen.process(&Snapshot::new());

        assert!(!data.title.is_empty(), "{} has no title", name);
        for (field, value) in &data.data {
            match value {
                Value::Number(n) => assert_eq!(n.as_f64(), Some(0.0), "{}.{}", name, field),
                Value::String(s) => assert_eq!(s, PLACEHOLDER, "{}.{}", name, field),
                _ => {}
            }
        }
    }
}

#[test]
fn test_cache_serves_fresh_values_without_fetching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let failing = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut manager = DataManager::new(MetricCache::new(Duration::from_secs(60)))
        .with_default_source(Some("counting".to_string()));
    manager.add_source(Box::new(CountingSource {
        calls: calls.clone(),
        failing: failing.clone(),
    }));

    let wanted = names(&["incidents.total"]);
    let start = Instant::now();

    tokio_test::block_on(async {
        manager.get_or_fetch(&wanted, start).await;
        for secs in 1..60 {
            manager
                .get_or_fetch(&wanted, start + Duration::from_secs(secs))
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // past the ttl a failing source leaves the stale value in place
        failing.store(true, Ordering::SeqCst);
        let snapshot = manager
            .get_or_fetch(&wanted, start + Duration::from_secs(61))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(snapshot["incidents.total"].value.as_f64(), Some(1.0));
    });
}

#[test]
fn test_rotation_cycle_length() {
    let screens: Vec<BoxedScreen> = [("a", 5), ("b", 10), ("c", 5)]
        .into_iter()
        .map(|(name, secs)| {
            Box::new(FixedScreen {
                name: name.to_string(),
                secs,
            }) as BoxedScreen
        })
        .collect();
    let mut rotator = ScreenRotator::new(screens).unwrap();

    let start = Instant::now();
    let shown: Vec<String> = (0..40u64)
        .map(|tick| {
            rotator
                .advance(start + Duration::from_secs(tick))
                .name()
                .to_string()
        })
        .collect();

    assert!(shown[..5].iter().all(|s| s == "a"));
    assert!(shown[5..15].iter().all(|s| s == "b"));
    assert!(shown[15..20].iter().all(|s| s == "c"));
    // the cycle repeats after the sum of the durations
    assert_eq!(shown[..20], shown[20..]);
}

#[test]
fn test_metric_values_deserialize_untagged() {
    let number: MetricValue = serde_json::from_str("42").unwrap();
    assert_eq!(number.as_f64(), Some(42.0));

    let map: MetricValue = serde_json::from_str(r#"{"P1": 2, "P2": 5}"#).unwrap();
    assert_eq!(map.as_map().unwrap()["P2"], 5.0);

    let text: MetricValue = serde_json::from_str(r#""17""#).unwrap();
    assert_eq!(text.as_f64(), Some(17.0));
}

#[test]
fn test_registry_lists_builtins() {
    let registry = PluginRegistry::with_builtins();
    assert_eq!(
        registry.list_screens(),
        vec![
            "assignment_groups",
            "incident_summary",
            "priority_breakdown",
            "service_requests",
            "system_health",
        ]
    );
    assert_eq!(registry.list_sources(), vec!["mock", "servicenow"]);
}

#[test]
fn test_terminal_frame_without_color() {
    let screen = ScreenData::new("System Health").with_field("percentage", 80.0);
    let frame = render_frame(&screen, "09:30", 32, false);
    assert!(frame.contains("System Health"));
    assert!(frame.contains("09:30"));
    assert!(!frame.contains('\u{1b}'));
}

#[test]
fn test_web_settings_from_yaml() {
    let config = DashboardConfig::from_yaml_str(
        "display:\n  width: 32\n  height: 16\n  web:\n    host: 127.0.0.1\n    port: 9000\n    max_viewers: 5\n    title: Service Desk\n    pixel_scale: 20\n",
    )
    .unwrap();
    let web = &config.display.web;

    assert_eq!(web.socket_addr().unwrap().to_string(), "127.0.0.1:9000");
    assert_eq!(web.max_viewers, 5);
    let page = web.viewer_page(config.display.width, config.display.height);
    assert!(page.contains("<title>Service Desk</title>"));
    assert!(page.contains("width: 640px"));
    assert!(page.contains("min-height: 320px"));
}
