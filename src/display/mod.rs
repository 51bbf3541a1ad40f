//! Display backends.
//!
//! A display receives one [`ScreenData`] per dispatch tick. Backends decide
//! themselves whether a frame identical to the previous one is drawn again.

pub mod dump;
pub mod terminal;
pub mod web;

pub use dump::DumpDisplay;
pub use terminal::TerminalDisplay;
pub use web::WebDisplay;

use crate::config::DisplayConfig;
use crate::error::Result;
use crate::metrics::data::ScreenData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output device for rendered screens.
#[async_trait]
pub trait Display: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Prepare the device. `Ok(false)` means the device is unusable.
    async fn initialize(&mut self, config: &DisplayConfig) -> Result<bool>;

    /// Show `screen`.
    async fn render(&mut self, screen: &ScreenData) -> Result<()>;

    /// Blank the device.
    async fn clear(&mut self) -> Result<()>;

    /// Release the device. Called once, after the last render.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Type-erased display for the dispatch loop
pub type BoxedDisplay = Box<dyn Display>;

/// Available display backends.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// ANSI text in the terminal
    #[default]
    Terminal,
    /// Live view in the browser
    Web,
    /// JSON-lines frame log
    Dump,
}

impl fmt::Display for DisplayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayBackend::Terminal => "terminal",
            DisplayBackend::Web => "web",
            DisplayBackend::Dump => "dump",
        };
        f.write_str(name)
    }
}

/// Create the display selected by `config.backend`.
pub fn create_display(config: &DisplayConfig) -> BoxedDisplay {
    match config.backend {
        DisplayBackend::Terminal => Box::new(TerminalDisplay::new()),
        DisplayBackend::Web => Box::new(WebDisplay::new(config.web.clone())),
        DisplayBackend::Dump => Box::new(DumpDisplay::new(config.dump.out_dir.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_display_by_backend() {
        let mut config = DisplayConfig::default();
        assert_eq!(create_display(&config).name(), "terminal");

        config.backend = DisplayBackend::Dump;
        assert_eq!(create_display(&config).name(), "dump");

        config.backend = DisplayBackend::Web;
        assert_eq!(create_display(&config).name(), "web");
    }

    #[test]
    fn test_backend_names() {
        let backend: DisplayBackend = serde_json::from_str(r#""dump""#).unwrap();
        assert_eq!(backend, DisplayBackend::Dump);
        assert_eq!(DisplayBackend::Web.to_string(), "web");
    }
}
