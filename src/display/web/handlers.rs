//! HTTP handlers for the web display.

use super::state::SharedState;
use crate::metrics::data::ScreenData;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::json;

/// Current frame as JSON; `204 No Content` until the first frame arrives.
pub async fn get_screen(
    State(state): State<SharedState>,
) -> Result<Json<ScreenData>, StatusCode> {
    state.current().await.map(Json).ok_or(StatusCode::NO_CONTENT)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let current = state.current().await;
    Json(json!({
        "status": "ok",
        "service": "itsm-board",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "started_at": state.started_at().to_rfc3339(),
        "viewers": state.client_count().await,
        "current_screen": current.map(|screen| screen.title),
    }))
}

/// Built-in viewer page, filled in by [`WebConfig::viewer_page`](super::WebConfig::viewer_page).
pub(crate) const VIEWER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{title}}</title>
    <style>
        body {
            font-family: 'DejaVu Sans Mono', Menlo, Consolas, monospace;
            background: #000;
            color: #fff;
            display: flex;
            justify-content: center;
            padding: 40px;
        }

        .panel {
            width: {{panel_width}}px;
            min-height: {{panel_height}}px;
            border: 2px solid #333;
            padding: 20px;
            image-rendering: pixelated;
        }

        .title { font-size: 2rem; margin-bottom: 12px; }
        .row { display: flex; justify-content: space-between; font-size: 1.4rem; }
        .bar { background: #222; height: 14px; margin: 4px 0 10px; }
        .bar span { display: block; height: 100%; }
        .alert { margin-top: 12px; font-weight: bold; animation: flash 1s steps(2) infinite; }
        .status { color: #666; margin-top: 20px; font-size: 0.9rem; }

        .white { color: #fff; } .red { color: #f33; } .green { color: #3f3; }
        .yellow { color: #ff3; } .blue { color: #39f; }

        @keyframes flash { 50% { opacity: 0.2; } }
    </style>
</head>
<body>
    <div class="panel">
        <div id="screen">Waiting for the first frame...</div>
        <div class="status" id="status">Connecting...</div>
    </div>

    <script>
        const palette = { white: '#fff', red: '#f33', green: '#3f3', yellow: '#ff3', blue: '#39f' };
        const alertColors = { critical: 'red', warning: 'yellow', info: 'blue' };
        let reconnectAttempts = 0;

        function escape(text) {
            const div = document.createElement('div');
            div.textContent = String(text);
            return div.innerHTML;
        }

        function render(screen) {
            let html = '';
            for (const section of screen.sections) {
                switch (section.type) {
                    case 'title':
                        html += `<div class="title ${section.color}">${escape(section.text)}</div>`;
                        break;
                    case 'metric':
                        html += `<div class="row"><span>${escape(section.label)}</span>` +
                            `<span class="${section.color}">${escape(section.value)}</span></div>`;
                        break;
                    case 'bar': {
                        const pct = section.max > 0 ? Math.min(100, 100 * section.value / section.max) : 0;
                        html += `<div>${escape(section.label)}</div><div class="bar">` +
                            `<span style="width:${pct}%;background:${palette[section.color]}"></span></div>`;
                        break;
                    }
                    default:
                        html += `<div class="${section.color}">${escape(section.text)}</div>`;
                }
            }
            for (const alert of screen.alerts) {
                html += `<div class="alert ${alertColors[alert.level]}">! ${escape(alert.message)}</div>`;
            }
            document.getElementById('screen').innerHTML = html;
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            const ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = () => {
                document.getElementById('status').textContent = 'Live';
                reconnectAttempts = 0;
            };
            ws.onmessage = (event) => {
                try {
                    render(JSON.parse(event.data));
                } catch (e) {
                    console.error('Bad frame:', e);
                }
            };
            ws.onclose = () => {
                document.getElementById('status').textContent = 'Disconnected, retrying...';
                reconnectAttempts++;
                setTimeout(connect, Math.min(30000, 2000 * reconnectAttempts));
            };
        }

        connect();
    </script>
</body>
</html>"#;
