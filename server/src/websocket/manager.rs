//! WebSocket connection manager.
//!
//! Tracks active live-feed connections and broadcasts session events to
//! them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A live-feed observer and its outgoing channel.
#[derive(Debug)]
struct Connection {
    viewer: String,
    sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Index of connections by viewer name.
    by_viewer: DashMap<String, Vec<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, viewer: String, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                viewer: viewer.clone(),
                sender,
            },
        );
        self.by_viewer
            .entry(viewer)
            .or_default()
            .push(conn_id.clone());

        tracing::debug!(conn_id = %conn_id, "Live feed connection registered");

        conn_id
    }

    /// Unregister a connection, dropping its viewer once no connection is
    /// left for it.
    pub fn unregister(&self, conn_id: &str) {
        let Some((_, conn)) = self.connections.remove(conn_id) else {
            return;
        };

        if let Some(mut conn_ids) = self.by_viewer.get_mut(&conn.viewer) {
            conn_ids.retain(|id| id != conn_id);
        }
        self.by_viewer
            .remove_if(&conn.viewer, |_, conn_ids| conn_ids.is_empty());

        tracing::debug!(
            conn_id = %conn_id,
            viewer = %conn.viewer,
            "Live feed connection unregistered"
        );
    }

    /// Broadcast a message to all connections.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            if entry.value().sender.send(message.clone()).is_ok() {
                sent_count += 1;
            }
        }

        tracing::debug!(recipients = sent_count, "Broadcast message to connections");

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.sender.send(message).is_ok()
        } else {
            false
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct viewers connected.
    pub fn viewer_count(&self) -> usize {
        self.by_viewer.len()
    }
}
