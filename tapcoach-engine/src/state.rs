//! Shared status state
//!
//! The control loop owns the session controller outright; HTTP handlers only
//! ever see the last snapshot it published here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::session::ControllerSnapshot;

/// Published view of the session for `/status`
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: ControllerSnapshot,
    /// When the session view last changed
    pub updated_at: DateTime<Utc>,
}

/// Shared state accessible by the control loop and HTTP handlers
pub struct SharedState {
    snapshot: RwLock<SessionSnapshot>,
}

impl SharedState {
    pub fn new(initial: ControllerSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(SessionSnapshot {
                session: initial,
                updated_at: Utc::now(),
            }),
        }
    }

    /// Store a new controller view; returns false when nothing changed
    pub async fn publish(&self, session: ControllerSnapshot) -> bool {
        if self.snapshot.read().await.session == session {
            return false;
        }
        let mut snapshot = self.snapshot.write().await;
        snapshot.session = session;
        snapshot.updated_at = Utc::now();
        true
    }

    /// Latest published snapshot
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().await.clone()
    }
}
