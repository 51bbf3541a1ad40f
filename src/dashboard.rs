//! The dispatch loop tying rotation, data, alerts and the display together.

use crate::alerts::{ActiveAlerts, AlertEvaluator};
use crate::config::{DashboardConfig, DisplayConfig};
use crate::display::BoxedDisplay;
use crate::error::{DashboardError, Result};
use crate::metrics::data::ScreenData;
use crate::metrics::manager::DataManager;
use crate::registry::PluginRegistry;
use crate::rotation::ScreenRotator;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Cloneable handle that stops a running dashboard at the next tick boundary.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one tick showed.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub screen: String,
    pub screen_index: usize,
    pub screen_data: ScreenData,
}

/// Owns every component of a running board.
pub struct Dashboard {
    rotator: ScreenRotator,
    data: DataManager,
    evaluator: AlertEvaluator,
    active_alerts: ActiveAlerts,
    display: BoxedDisplay,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
}

impl Dashboard {
    pub fn new(
        rotator: ScreenRotator,
        data: DataManager,
        evaluator: AlertEvaluator,
        display: BoxedDisplay,
        tick_interval: Duration,
    ) -> Self {
        Self {
            rotator,
            data,
            evaluator,
            active_alerts: ActiveAlerts::new(),
            display,
            tick_interval,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Assemble a dashboard from `config`, resolving screens and sources
    /// through `registry`.
    pub fn from_config(
        config: &DashboardConfig,
        registry: &PluginRegistry,
        display: BoxedDisplay,
    ) -> Result<Self> {
        let rotator = ScreenRotator::new(registry.build_screens(config)?)?;

        let mut data = DataManager::from_config(config);
        let sources = registry.build_sources(config);
        if sources.is_empty() {
            warn!("No data source could be created; every screen will show defaults");
        }
        for source in sources {
            data.add_source(source);
        }

        info!(
            "Dashboard assembled: screens {:?}, sources {:?}",
            rotator.screen_names(),
            data.source_names()
        );

        Ok(Self::new(
            rotator,
            data,
            AlertEvaluator::from_config(&config.alerts),
            display,
            config.display.tick_interval(),
        ))
    }

    /// Initialize the display and connect the data sources.
    ///
    /// A display that fails or refuses to initialize is fatal. Sources that
    /// fail to connect are only logged; their fetches are retried every tick.
    pub async fn start(&mut self, config: &DisplayConfig) -> Result<()> {
        match self.display.initialize(config).await {
            Ok(true) => info!("Display {} initialized", self.display.name()),
            Ok(false) => {
                return Err(DashboardError::display_error(format!(
                    "display {} refused to initialize",
                    self.display.name()
                )))
            }
            Err(e) => return Err(e),
        }

        if !self.data.connect_all().await {
            warn!("Not every data source connected; continuing with what is available");
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn active_alerts(&self) -> &ActiveAlerts {
        &self.active_alerts
    }

    pub fn data(&self) -> &DataManager {
        &self.data
    }

    /// Run one dispatch step at `now` and return what was rendered.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let screen = self.rotator.advance(now);
        let name = screen.name().to_string();
        let needed = screen.required_metrics();

        let snapshot = self.data.get_or_fetch(&needed, now).await;

        let screen = self.rotator.current();
        let processed = panic::catch_unwind(AssertUnwindSafe(|| screen.process(&snapshot)));
        let mut screen_data = match processed {
            Ok(data) => data,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Screen {} panicked while processing: {}", name, message);
                ScreenData::error(&name, message)
            }
        };

        let evaluation = self.evaluator.evaluate(&snapshot, &self.active_alerts);
        self.active_alerts = evaluation.active;
        screen_data.alerts.extend(evaluation.raised);

        if let Err(e) = self.display.render(&screen_data).await {
            warn!("Display {} failed to render {}: {}", self.display.name(), name, e);
        }

        TickReport {
            screen: name,
            screen_index: self.rotator.current_index(),
            screen_data,
        }
    }

    /// Tick until stopped, then disconnect sources and shut the display down.
    pub async fn run(&mut self) -> Result<()> {
        info!("Dashboard running, tick every {:?}", self.tick_interval);
        while self.running.load(Ordering::SeqCst) {
            let report = self.tick(Instant::now()).await;
            debug!("Rendered {} ({} alerts)", report.screen, report.screen_data.alerts.len());
            tokio::time::sleep(self.tick_interval).await;
        }
        self.shutdown().await
    }

    /// Disconnect every source and release the display.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down dashboard");
        self.running.store(false, Ordering::SeqCst);
        self.data.disconnect_all().await;

        if let Err(e) = self.display.clear().await {
            debug!("Display clear failed during shutdown: {}", e);
        }
        self.display.shutdown().await
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "screen panicked".to_string())
}
