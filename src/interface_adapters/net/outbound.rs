use crate::domain::SessionId;
use crate::interface_adapters::protocol::ServerMessage;
use crate::use_cases::{Broadcaster, Outbound, ServerEvent};

use axum::extract::ws::Utf8Bytes;
use std::collections::HashSet;
use std::sync::RwLock;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One serialized event on the shared stream. `to` is set for events meant
/// for a single session; every other connection skips them.
#[derive(Debug, Clone)]
pub struct Frame {
    pub to: Option<SessionId>,
    pub bytes: Utf8Bytes,
}

impl Frame {
    pub fn is_for(&self, session_id: SessionId) -> bool {
        self.to.is_none_or(|to| to == session_id)
    }
}

/// Fans world output out to connections.
///
/// Every event, targeted or not, is serialized by one task and published on a
/// single stream, so each connection sees them in the order the world produced
/// them. The latest world snapshot is kept for lag recovery.
pub struct SessionHub {
    events_tx: broadcast::Sender<Outbound>,
    frames_tx: broadcast::Sender<Frame>,
    latest_tx: watch::Sender<Utf8Bytes>,
    sessions: RwLock<HashSet<SessionId>>,
}

impl SessionHub {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(broadcast_capacity);
        let (frames_tx, _) = broadcast::channel(broadcast_capacity);
        let (latest_tx, _) = watch::channel(Utf8Bytes::from(""));
        Self {
            events_tx,
            frames_tx,
            latest_tx,
            sessions: RwLock::new(HashSet::new()),
        }
    }

    pub fn spawn_serializer(&self) -> JoinHandle<()> {
        tokio::spawn(event_serializer(
            self.events_tx.subscribe(),
            self.frames_tx.clone(),
            self.latest_tx.clone(),
        ))
    }

    /// Shared serialized events. Subscribe before announcing the session so
    /// nothing is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.frames_tx.subscribe()
    }

    pub fn latest_world(&self) -> watch::Receiver<Utf8Bytes> {
        self.latest_tx.subscribe()
    }

    pub fn register(&self, session_id: SessionId) {
        // A poisoned set is still structurally sound; keep serving.
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session_id);
    }

    pub fn unregister(&self, session_id: SessionId) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&session_id);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn is_connected(&self, session_id: SessionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&session_id)
    }
}

impl Broadcaster for SessionHub {
    fn send_to_all(&self, event: ServerEvent) {
        // No subscribers just means nobody is connected.
        let _ = self.events_tx.send(Outbound::All(event));
    }

    fn send_to_one(&self, session_id: SessionId, event: ServerEvent) {
        if !self.is_connected(session_id) {
            debug!(session_id, "no connection for session; dropping event");
            return;
        }
        let _ = self.events_tx.send(Outbound::One(session_id, event));
    }
}

fn encode(msg: ServerMessage) -> Option<Utf8Bytes> {
    match serde_json::to_string(&msg) {
        Ok(txt) => Some(Utf8Bytes::from(txt)),
        Err(e) => {
            error!(error = ?e, "failed to serialize server message");
            None
        }
    }
}

pub async fn event_serializer(
    mut events_rx: broadcast::Receiver<Outbound>,
    frames_tx: broadcast::Sender<Frame>,
    latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match events_rx.recv().await {
            Ok(outbound) => {
                let (to, event) = match outbound {
                    Outbound::All(event) => (None, event),
                    Outbound::One(session_id, event) => (Some(session_id), event),
                };
                let is_world_state = matches!(event, ServerEvent::WorldState(_));
                let Some(bytes) = encode(ServerMessage::from(event)) else {
                    continue;
                };
                if is_world_state {
                    latest_tx.send_replace(bytes.clone());
                }
                let _ = frames_tx.send(Frame { to, bytes });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "event serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("event channel closed; serializer exiting");
                break;
            }
        }
    }
}
