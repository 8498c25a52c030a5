//! Connection registry and outbound message routing

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::player::PlayerId;

use super::protocol::ServerMsg;

/// Outbound frames buffered per connection before it counts as stalled
pub const SESSION_BUFFER: usize = 64;

/// Outbound delivery errors
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("outbound queue full")]
    QueueFull,

    #[error("connection closed")]
    Closed,
}

/// Registry of open connections. Holds only a sender per connection id;
/// player state lives in the match task.
pub struct Hub {
    sessions: DashMap<PlayerId, mpsc::Sender<String>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a connection and get the receiving end of its outbound queue
    pub fn register(&self, id: PlayerId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions.insert(id, tx);
        rx
    }

    /// Forget a connection. Dropping the sender ends its writer task.
    pub fn unregister(&self, id: PlayerId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, id: PlayerId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Send to one connection. On failure the connection is dropped.
    pub fn send_to(&self, id: PlayerId, msg: &ServerMsg) -> Result<(), SendError> {
        let text = serde_json::to_string(msg)?;
        let result = match self.sessions.get(&id) {
            Some(tx) => deliver(&tx, text),
            None => Err(SendError::Closed),
        };
        if let Err(e) = &result {
            self.drop_session(id, e);
        }
        result
    }

    /// Send to every connection
    pub fn broadcast(&self, msg: &ServerMsg) {
        self.fan_out(msg, None);
    }

    /// Send to every connection except one
    pub fn broadcast_except(&self, except: PlayerId, msg: &ServerMsg) {
        self.fan_out(msg, Some(except));
    }

    /// Serialize once, then hand a copy to each queue without waiting.
    /// Stalled or closed connections are removed after the pass.
    fn fan_out(&self, msg: &ServerMsg, except: Option<PlayerId>) {
        let text = match serde_json::to_string(msg) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize broadcast");
                return;
            }
        };

        let mut failed = Vec::new();
        for entry in self.sessions.iter() {
            if Some(*entry.key()) == except {
                continue;
            }
            if let Err(e) = deliver(entry.value(), text.clone()) {
                failed.push((*entry.key(), e));
            }
        }

        for (id, e) in failed {
            self.drop_session(id, &e);
        }
    }

    fn drop_session(&self, id: PlayerId, error: &SendError) {
        if self.sessions.remove(&id).is_some() {
            warn!(player_id = %id, error = %error, "Dropping connection after failed send");
        } else {
            debug!(player_id = %id, "Send to unknown connection");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(tx: &mpsc::Sender<String>, text: String) -> Result<(), SendError> {
    tx.try_send(text).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
        mpsc::error::TrySendError::Closed(_) => SendError::Closed,
    })
}
