//! Registry mapping configured names to screens and data sources.
//!
//! Built-ins are registered explicitly by [`PluginRegistry::with_builtins`];
//! nothing is discovered at runtime.

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::metrics::mock::MockSource;
use crate::metrics::servicenow::ServiceNowSource;
use crate::metrics::source::BoxedDataSource;
use crate::screens::custom_metric::SCREEN_PREFIX;
use crate::screens::{
    AssignmentGroupsScreen, BoxedScreen, CustomMetricScreen, IncidentSummaryScreen,
    PriorityBreakdownScreen, ServiceRequestsScreen, SystemHealthScreen,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Function that creates a screen from its name and the configuration
pub type ScreenFactory = fn(&str, &DashboardConfig) -> Result<BoxedScreen>;

/// Function that creates a data source from the configuration
pub type SourceFactory = fn(&DashboardConfig) -> Result<BoxedDataSource>;

/// Registry for screens and data sources.
pub struct PluginRegistry {
    screens: BTreeMap<String, ScreenFactory>,
    sources: BTreeMap<String, SourceFactory>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            screens: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in screen and source.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_screen(IncidentSummaryScreen::NAME, |_, config| {
            Ok(Box::new(IncidentSummaryScreen::from_config(config)))
        });
        registry.register_screen(PriorityBreakdownScreen::NAME, |_, config| {
            Ok(Box::new(PriorityBreakdownScreen::from_config(config)))
        });
        registry.register_screen(ServiceRequestsScreen::NAME, |_, config| {
            Ok(Box::new(ServiceRequestsScreen::from_config(config)))
        });
        registry.register_screen(AssignmentGroupsScreen::NAME, |_, config| {
            Ok(Box::new(AssignmentGroupsScreen::from_config(config)))
        });
        registry.register_screen(SystemHealthScreen::NAME, |_, config| {
            Ok(Box::new(SystemHealthScreen::from_config(config)))
        });

        registry.register_source(MockSource::NAME, |config| {
            Ok(Box::new(MockSource::new(&config.data_sources.mock)))
        });
        registry.register_source(ServiceNowSource::NAME, |config| {
            let servicenow = config.data_sources.servicenow.clone().ok_or_else(|| {
                DashboardError::config_error("data_sources.servicenow is not configured")
            })?;
            Ok(Box::new(ServiceNowSource::new(
                servicenow,
                config.custom_metrics.clone(),
            )?))
        });

        registry
    }

    /// Register a screen, replacing any factory with the same name
    pub fn register_screen(&mut self, name: &str, factory: ScreenFactory) {
        self.screens.insert(name.to_string(), factory);
    }

    /// Register a data source, replacing any factory with the same name
    pub fn register_source(&mut self, name: &str, factory: SourceFactory) {
        self.sources.insert(name.to_string(), factory);
    }

    /// Create a screen by name.
    ///
    /// Names without a registered factory that start with `custom_` resolve
    /// to the custom metric screen of the same name.
    pub fn create_screen(&self, name: &str, config: &DashboardConfig) -> Result<BoxedScreen> {
        if let Some(factory) = self.screens.get(name) {
            return factory(name, config);
        }
        if name.starts_with(SCREEN_PREFIX) {
            return Ok(Box::new(CustomMetricScreen::from_config(name, config)?));
        }
        Err(DashboardError::unknown_screen(name))
    }

    /// Create a data source by name
    pub fn create_source(&self, name: &str, config: &DashboardConfig) -> Result<BoxedDataSource> {
        let factory = self
            .sources
            .get(name)
            .ok_or_else(|| DashboardError::unknown_source(name))?;
        factory(config)
    }

    /// List all registered screen names
    pub fn list_screens(&self) -> Vec<String> {
        self.screens.keys().cloned().collect()
    }

    /// List all registered data source names
    pub fn list_sources(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    /// Build the rotation from `display.screens`.
    ///
    /// Names that cannot be resolved are logged and skipped. Fails with
    /// [`DashboardError::NoScreens`] when nothing is left.
    pub fn build_screens(&self, config: &DashboardConfig) -> Result<Vec<BoxedScreen>> {
        let mut screens = Vec::new();
        for name in &config.display.screens {
            match self.create_screen(name, config) {
                Ok(screen) => {
                    debug!("Loaded screen {}", name);
                    screens.push(screen);
                }
                Err(e) => warn!("Skipping screen {}: {}", name, e),
            }
        }

        if screens.is_empty() {
            return Err(DashboardError::NoScreens);
        }
        Ok(screens)
    }

    /// Instantiate every source in `data_sources.enabled`; failures are
    /// logged and skipped.
    pub fn build_sources(&self, config: &DashboardConfig) -> Vec<BoxedDataSource> {
        config
            .data_sources
            .enabled
            .iter()
            .filter_map(|name| match self.create_source(name, config) {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!("Skipping data source {}: {}", name, e);
                    None
                }
            })
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
