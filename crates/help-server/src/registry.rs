//! Registry of authenticated observers.
//!
//! Each observer is represented by the sending half of a bounded queue that
//! its WebSocket task drains. The registry owns the only strong sender per
//! connection: dropping an entry ends that observer's stream.

use std::collections::HashMap;

use help_alert::{AlertSnapshot, StatusBroadcaster};
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::messages::ServerMessage;

/// Identifier assigned to each registered connection.
pub type ConnectionId = Uuid;

/// Outbound queue handle for one observer.
pub type ConnectionHandle = mpsc::Sender<ServerMessage>;

/// Tracks connected observers and fans messages out to them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and returns its id.
    pub fn register(&self, handle: ConnectionHandle) -> ConnectionId {
        let id = Uuid::new_v4();
        let count = {
            let mut connections = self.connections.write();
            connections.insert(id, handle);
            connections.len()
        };
        info!(connection = %id, connections = count, "observer connected");
        id
    }

    /// Removes a connection. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) {
        let removed = self.connections.write().remove(&id);
        if removed.is_some() {
            info!(connection = %id, connections = self.count(), "observer disconnected");
        }
    }

    /// Queues `message` for every connection without waiting.
    ///
    /// Connections whose queue is closed or full are removed after the pass.
    /// Returns the number of connections the message was queued for.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let connections = self.connections.read();
            for (id, handle) in connections.iter() {
                match handle.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(connection = %id, "observer queue full, dropping connection");
                        failed.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(connection = %id, "observer queue closed");
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write();
            for id in &failed {
                connections.remove(id);
            }
        }

        delivered
    }

    /// Number of registered connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Drops every connection, ending all observer streams.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut connections = self.connections.write();
            let closed = connections.len();
            connections.clear();
            closed
        };
        info!(closed, "closed all observer connections");
        closed
    }
}

impl StatusBroadcaster for ConnectionRegistry {
    fn broadcast(&self, snapshot: &AlertSnapshot) -> usize {
        Self::broadcast(self, &ServerMessage::Status { status: *snapshot })
    }

    fn connection_count(&self) -> usize {
        self.count()
    }
}
