mod common;

use common::{scenario_config, RecordingDisplay};
use itsm_board::display::dump::{read_frames, FRAMES_FILE};
use itsm_board::display::DumpDisplay;
use itsm_board::{AlertLevel, AlertRule, Dashboard, DashboardConfig, PluginRegistry};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_rotation_and_alerts_over_twenty_ticks() {
    let config = scenario_config();
    let display = RecordingDisplay::default();
    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(display.clone()),
    )
    .unwrap();
    dashboard.start(&config.display).await.unwrap();

    let start = Instant::now();
    for tick in 0..20u64 {
        let report = dashboard.tick(start + Duration::from_secs(tick)).await;

        if tick < 10 {
            assert_eq!(report.screen, "incident_summary", "tick {}", tick);
            assert_eq!(report.screen_data.number("total"), Some(42.0));
            assert_eq!(report.screen_data.number("critical"), Some(5.0));
            assert!(report.screen_data.has_alert(AlertLevel::Critical), "tick {}", tick);
            assert!(!report.screen_data.has_alert(AlertLevel::Warning));
        } else {
            assert_eq!(report.screen, "system_health", "tick {}", tick);
            assert_eq!(report.screen_data.number("percentage"), Some(80.0));
            assert!(report.screen_data.has_alert(AlertLevel::Warning), "tick {}", tick);
            // the health screen does not fetch incidents, so that alert stays quiet
            assert!(!report.screen_data.has_alert(AlertLevel::Critical));
        }
    }

    // both conditions are still active at the end
    let active = dashboard.active_alerts();
    assert!(active.contains_key(AlertRule::CRITICAL_INCIDENTS));
    assert!(active.contains_key(AlertRule::SYSTEM_HEALTH));

    assert_eq!(display.frames().len(), 20);
    dashboard.shutdown().await.unwrap();
    assert!(display.was_shut_down());
}

#[tokio::test]
async fn test_active_alert_keeps_first_timestamp() {
    let config = scenario_config();
    let display = RecordingDisplay::default();
    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(display.clone()),
    )
    .unwrap();

    let start = Instant::now();
    let first = dashboard.tick(start).await;
    let later = dashboard.tick(start + Duration::from_secs(3)).await;

    let stamp = |report: &itsm_board::TickReport| {
        report
            .screen_data
            .alerts
            .iter()
            .find(|a| a.key == AlertRule::CRITICAL_INCIDENTS)
            .map(|a| a.timestamp)
    };
    assert!(stamp(&first).is_some());
    assert_eq!(stamp(&first), stamp(&later));
}

#[tokio::test]
async fn test_unknown_names_are_skipped() {
    let mut config = scenario_config();
    config.display.screens = vec![
        "incident_summary".to_string(),
        "weather_radar".to_string(),
    ];
    config.data_sources.enabled = vec!["mock".to_string(), "jira".to_string()];

    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(RecordingDisplay::default()),
    )
    .unwrap();

    assert_eq!(dashboard.data().source_names(), vec!["mock"]);
    let report = dashboard.tick(Instant::now()).await;
    assert_eq!(report.screen, "incident_summary");
}

#[tokio::test]
async fn test_only_unknown_screens_is_fatal() {
    let mut config = DashboardConfig::default();
    config.display.screens = vec!["weather_radar".to_string()];

    let result = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(RecordingDisplay::default()),
    );
    assert!(matches!(result, Err(itsm_board::DashboardError::NoScreens)));
}

#[tokio::test]
async fn test_run_writes_frame_log_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scenario_config();
    config.display.dump.out_dir = dir.path().to_path_buf();

    let display = DumpDisplay::new(dir.path());
    let mut dashboard =
        Dashboard::from_config(&config, &PluginRegistry::with_builtins(), Box::new(display))
            .unwrap();
    dashboard.start(&config.display).await.unwrap();

    let stop = dashboard.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.stop();
    });
    tokio::time::timeout(Duration::from_secs(5), dashboard.run())
        .await
        .expect("dashboard did not stop")
        .unwrap();

    let frames = read_frames(dir.path().join(FRAMES_FILE)).await.unwrap();
    assert!(!frames.is_empty());
    assert!(frames.iter().all(|f| f.session == frames[0].session));
    assert_eq!(frames[0].sequence, 0);
    assert_eq!(frames[0].screen.title, "Incident Summary");
}

#[tokio::test]
async fn test_servicenow_source_feeds_screens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/table/incident"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"number": "INC001", "priority": "1", "state": "2", "assignment_group": "Network"},
                {"number": "INC002", "priority": "2", "state": "1", "assignment_group": "Network"},
                {"number": "INC003", "priority": "4", "state": "6", "assignment_group": "Database"}
            ]
        })))
        .mount(&server)
        .await;

    let yaml = format!(
        r#"
display:
  screens: [incident_summary]
data_sources:
  enabled: [servicenow]
  servicenow:
    instance_url: "{}"
    username: admin
    password: secret
"#,
        server.uri()
    );
    let config = DashboardConfig::from_yaml_str(&yaml).unwrap();

    let display = RecordingDisplay::default();
    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(display.clone()),
    )
    .unwrap();
    dashboard.start(&config.display).await.unwrap();

    let report = dashboard.tick(Instant::now()).await;
    assert_eq!(report.screen_data.number("total"), Some(3.0));
    assert_eq!(report.screen_data.number("critical"), Some(2.0));
    assert_eq!(report.screen_data.number("open"), Some(2.0));
    // two critical incidents stay below the default threshold of five
    assert!(report.screen_data.alerts.is_empty());

    dashboard.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_servicenow_shows_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let yaml = format!(
        "display:\n  screens: [incident_summary]\ndata_sources:\n  enabled: [servicenow]\n  servicenow:\n    instance_url: \"{}\"\n",
        server.uri()
    );
    let config = DashboardConfig::from_yaml_str(&yaml).unwrap();
    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(RecordingDisplay::default()),
    )
    .unwrap();

    // a failed connect does not prevent startup
    dashboard.start(&config.display).await.unwrap();
    let report = dashboard.tick(Instant::now()).await;
    assert_eq!(report.screen, "incident_summary");
    assert_eq!(report.screen_data.number("total"), Some(0.0));
    assert_eq!(report.screen_data.text("updated"), Some("--"));
}

#[tokio::test]
async fn test_mock_alongside_servicenow_without_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let yaml = format!(
        "display:\n  screens: [incident_summary]\ndata_sources:\n  enabled: [mock, servicenow]\n  servicenow:\n    instance_url: \"{}\"\n",
        server.uri()
    );
    let mut config = DashboardConfig::from_yaml_str(&yaml).unwrap();
    config
        .data_sources
        .mock
        .values
        .insert("incidents.total".to_string(), itsm_board::MetricValue::Number(42.0));

    let mut dashboard = Dashboard::from_config(
        &config,
        &PluginRegistry::with_builtins(),
        Box::new(RecordingDisplay::default()),
    )
    .unwrap();
    assert_eq!(dashboard.data().source_names(), vec!["mock", "servicenow"]);

    let start = Instant::now();
    dashboard.tick(start).await;
    let report = dashboard.tick(start + Duration::from_secs(1)).await;

    assert_eq!(report.screen_data.number("total"), Some(42.0));
    assert_ne!(report.screen_data.text("updated"), Some("--"));
    assert!(!dashboard.data().cache().is_empty());
}
