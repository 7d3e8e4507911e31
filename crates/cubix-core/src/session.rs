//! Per-sender conversation sessions
//!
//! Sessions live for the process lifetime; there is no eviction. The
//! per-session mutex is what serializes concurrent events from the same
//! sender while leaving different senders free to run in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Navigation position in the menu tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvState {
    #[default]
    Initial,
    Menu,
    F2l,
    Oll,
    Pll,
    F2lGroup,
    OllGroup,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: ConvState,
    /// Name of the group being browsed. Meaningful only in the two
    /// group-browsing states.
    pub group: Option<String>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sender's session handle, creating a fresh `Initial`
    /// session on first contact.
    pub async fn handle_for(&self, sender: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
