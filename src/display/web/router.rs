//! Web application router and middleware setup.

use super::config::WebConfig;
use super::handlers;
use super::state::SharedState;
use super::websocket;
use axum::response::Html;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the axum application serving `state`.
///
/// `/` serves `index.html` from the static directory when there is one,
/// otherwise `viewer_page`.
pub fn create_app(config: &WebConfig, viewer_page: String, state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/api/screen", get(handlers::get_screen))
        .route("/api/health", get(handlers::health_check))
        .route("/ws", get(websocket::websocket_handler));

    if let (Some(path), None) = (&config.static_path, config.static_dir()) {
        warn!("Static path {:?} does not exist, serving the built-in viewer", path);
    }

    let mut index_file = None;
    if let Some(dir) = config.static_dir() {
        info!("Serving static files from: {:?}", dir);
        app = app.nest_service("/static", ServeDir::new(dir));
        index_file = Some(dir.join("index.html")).filter(|index| index.is_file());
    }

    app = match index_file {
        Some(index) => app.route_service("/", ServeFile::new(index)),
        None => {
            let page: Arc<str> = Arc::from(viewer_page);
            app.route("/", get(move || async move { Html(page.to_string()) }))
        }
    };

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
