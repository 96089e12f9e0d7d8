// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-connection session tracking for the SSE transport.
//!
//! Each open event stream owns one session: a uuid and an outbound message
//! queue. The registration handle removes the session on drop, so every
//! disconnect path cleans up the table.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Queue depth per session before senders start failing.
const SESSION_QUEUE_DEPTH: usize = 32;

/// Table of live SSE sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionTable {
    inner: Arc<RwLock<HashMap<String, mpsc::Sender<Value>>>>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session, returning its removal guard and the receive
    /// side of its message queue.
    pub fn register(&self) -> (SessionGuard, mpsc::Receiver<Value>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_DEPTH);

        if let Ok(mut table) = self.inner.write() {
            table.insert(id.clone(), tx);
        }
        debug!(session = %id, "SSE session registered");

        (
            SessionGuard {
                id,
                table: Arc::clone(&self.inner),
            },
            rx,
        )
    }

    /// Queue a message for a session. Returns false if the session is gone
    /// or its queue is full.
    pub fn send(&self, session_id: &str, message: Value) -> bool {
        let Ok(table) = self.inner.read() else {
            return false;
        };
        match table.get(session_id) {
            Some(tx) => tx.try_send(message).is_ok(),
            None => false,
        }
    }

    /// Check whether a session is live.
    pub fn contains(&self, session_id: &str) -> bool {
        self.inner
            .read()
            .map(|table| table.contains_key(session_id))
            .unwrap_or(false)
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.inner.read().map(|table| table.len()).unwrap_or(0)
    }
}

/// Removes its session from the table when dropped.
pub struct SessionGuard {
    id: String,
    table: Arc<RwLock<HashMap<String, mpsc::Sender<Value>>>>,
}

impl SessionGuard {
    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.write() {
            table.remove(&self.id);
        }
        debug!(session = %self.id, "SSE session removed");
    }
}
