//! Web display settings, read from `display.web`.

use super::handlers::VIEWER_TEMPLATE;
use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// How the web display serves the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// IP address to listen on; `localhost` is accepted
    pub host: String,
    /// `0` picks a free port
    pub port: u16,
    pub enable_cors: bool,
    /// Directory with a custom `index.html` and assets served under `/static`
    pub static_path: Option<PathBuf>,
    /// Concurrent WebSocket viewers; further upgrades get `503`
    pub max_viewers: usize,
    /// Heading of the built-in viewer page
    pub title: String,
    /// Browser pixels per panel pixel in the built-in viewer
    pub pixel_scale: u32,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            static_path: None,
            max_viewers: 100,
            title: "ITSM Board".to_string(),
            pixel_scale: 10,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = match self.host.as_str() {
            "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            host => host.trim_matches(|c| c == '[' || c == ']').parse().map_err(|_| {
                DashboardError::config_error(format!(
                    "display.web.host '{}' is not an IP address",
                    self.host
                ))
            })?,
        };
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Configured static directory, when it exists.
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_path.as_deref().filter(|path| path.is_dir())
    }

    /// Built-in viewer page for a `width` x `height` panel.
    pub fn viewer_page(&self, width: u32, height: u32) -> String {
        let scale = self.pixel_scale.max(1);
        VIEWER_TEMPLATE
            .replace("{{title}}", &escape_html(&self.title))
            .replace("{{panel_width}}", &(width * scale).to_string())
            .replace("{{panel_height}}", &(height * scale).to_string())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
