//! # ITSM Board - Rotating Ticket Dashboard
//!
//! Polls a ticketing/ITSM REST API on a schedule, aggregates the results
//! into counters and breakdowns, and rotates the aggregated view across a
//! set of screens rendered to a low-resolution display (a terminal, a live
//! web view, or a frame log standing in for an LED matrix).
//!
//! ## Features
//!
//! - **Per-metric refresh**: every metric has its own time-to-live, stale
//!   values keep being served while a source is down
//! - **Screen rotation**: each screen decides how long it stays visible
//! - **Threshold alerts**: critical incident and system health rules with
//!   clear-on-recovery
//! - **Pluggable sources, screens and displays**: an explicit registry maps
//!   names from the configuration to implementations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use itsm_board::{create_display, Dashboard, DashboardConfig, PluginRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DashboardConfig::load("config", "development")?;
//!     let registry = PluginRegistry::with_builtins();
//!     let display = create_display(&config.display);
//!
//!     let mut dashboard = Dashboard::from_config(&config, &registry, display)?;
//!     dashboard.start(&config.display).await?;
//!     dashboard.run().await?;
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod rotation;
pub mod screens;

// Re-export public API
pub use alerts::{ActiveAlerts, AlertEvaluation, AlertEvaluator, AlertRule, Comparison};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, StopHandle, TickReport};
pub use display::{create_display, Display, DisplayBackend};
pub use error::{DashboardError, Result};
pub use metrics::{
    cache::MetricCache,
    data::{Alert, AlertLevel, DataPoint, MetricValue, ScreenData, Section, Snapshot},
    manager::DataManager,
    source::{DataSource, SourceState},
};
pub use registry::PluginRegistry;
pub use rotation::ScreenRotator;
pub use screens::Screen;

/// Pause between two dispatch loop ticks, in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// How long a fetched metric stays fresh, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// How long a screen stays visible absent a per-screen override, in seconds
pub const DEFAULT_ROTATION_SECS: u64 = 10;

/// The default web display port
pub const DEFAULT_WEB_PORT: u16 = 8080;
