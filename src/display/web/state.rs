//! State shared between the web display and its server task.

use crate::metrics::data::ScreenData;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Frames buffered per viewer before slow viewers start skipping
const BROADCAST_CAPACITY: usize = 16;

/// A connected WebSocket viewer.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
}

/// Latest frame, frame broadcast and viewer registry.
#[derive(Debug)]
pub struct AppState {
    current: RwLock<Option<ScreenData>>,
    tx: broadcast::Sender<ScreenData>,
    clients: RwLock<HashMap<Uuid, Client>>,
    max_connections: usize,
    started_at: DateTime<Utc>,
}

/// Handle passed to every request handler
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(max_connections: usize) -> SharedState {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Arc::new(Self {
            current: RwLock::new(None),
            tx,
            clients: RwLock::new(HashMap::new()),
            max_connections,
            started_at: Utc::now(),
        })
    }

    /// Store `screen` as the current frame and push it to every viewer.
    pub async fn publish(&self, screen: ScreenData) {
        *self.current.write().await = Some(screen.clone());
        // no receivers just means nobody is watching
        if let Ok(receivers) = self.tx.send(screen) {
            debug!("Broadcast frame to {} viewers", receivers);
        }
    }

    /// Forget the current frame.
    pub async fn clear(&self) {
        *self.current.write().await = None;
    }

    pub async fn current(&self) -> Option<ScreenData> {
        self.current.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScreenData> {
        self.tx.subscribe()
    }

    /// Register a viewer unless the limit is reached.
    pub async fn register_client(&self) -> Option<Client> {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.max_connections {
            return None;
        }
        let client = Client {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
        };
        clients.insert(client.id, client.clone());
        Some(client)
    }

    /// Whether the viewer limit is reached.
    pub async fn is_full(&self) -> bool {
        self.client_count().await >= self.max_connections
    }

    pub async fn remove_client(&self, id: &Uuid) {
        self.clients.write().await.remove(id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let state = AppState::new(10);
        let mut rx = state.subscribe();

        state.publish(ScreenData::new("Incident Summary")).await;
        assert_eq!(rx.recv().await.unwrap().title, "Incident Summary");
        assert_eq!(state.current().await.unwrap().title, "Incident Summary");

        state.clear().await;
        assert!(state.current().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_without_viewers() {
        let state = AppState::new(10);
        state.publish(ScreenData::new("System Health")).await;
        assert!(state.current().await.is_some());
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let state = AppState::new(1);
        let first = state.register_client().await.unwrap();
        assert!(state.is_full().await);
        assert!(state.register_client().await.is_none());

        state.remove_client(&first.id).await;
        assert_eq!(state.client_count().await, 0);
        assert!(state.register_client().await.is_some());
    }
}
