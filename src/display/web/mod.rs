//! Web display: serves the current screen to browsers.
//!
//! The dispatch loop publishes each frame into shared state; the axum server
//! running in its own task exposes it over REST (`/api/screen`) and pushes it
//! to WebSocket viewers (`/ws`).

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;
pub use state::{AppState, SharedState};

use super::Display;
use crate::config::DisplayConfig;
use crate::error::{DashboardError, Result};
use crate::metrics::data::ScreenData;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Display backed by an embedded web server.
pub struct WebDisplay {
    config: WebConfig,
    state: SharedState,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl WebDisplay {
    /// Create a display serving on the address in `config`.
    pub fn new(config: WebConfig) -> Self {
        let state = AppState::new(config.max_viewers);
        Self {
            config,
            state,
            local_addr: None,
            shutdown_tx: None,
            server: None,
        }
    }

    /// Address the server is bound to, once initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

#[async_trait]
impl Display for WebDisplay {
    fn name(&self) -> &str {
        "web"
    }

    /// Bind and start the server. The bind address comes from the
    /// [`WebConfig`] given at construction; the panel size sizes the
    /// built-in viewer page.
    async fn initialize(&mut self, config: &DisplayConfig) -> Result<bool> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            DashboardError::web_server_error(format!("Failed to bind to {}: {}", addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        let viewer_page = self.config.viewer_page(config.width, config.height);
        let app = create_app(&self.config, viewer_page, self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("Web display server error: {}", e);
            }
        });

        info!("Web display available at http://{}/", local_addr);
        info!("API endpoint: http://{}/api/screen", local_addr);
        info!("WebSocket endpoint: ws://{}/ws", local_addr);

        self.local_addr = Some(local_addr);
        self.shutdown_tx = Some(shutdown_tx);
        self.server = Some(server);
        Ok(true)
    }

    async fn render(&mut self, screen: &ScreenData) -> Result<()> {
        if self.server.is_none() {
            return Err(DashboardError::display_error("web display is not initialized"));
        }
        self.state.publish(screen.clone()).await;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.state.clear().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            if let Err(e) = server.await {
                warn!("Web display server task ended abnormally: {}", e);
            }
        }
        info!("Web display stopped");
        Ok(())
    }
}
