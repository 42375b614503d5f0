//! Outbound channels and the per-game registry of which ones are usable.

use crate::types::UserId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("channel {0} is closed")]
    Closed(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

/// A handle to somewhere text can be sent.
///
/// `channel_id` identifies the underlying channel; two sessions with the same
/// id are interchangeable.
#[async_trait]
pub trait Session: Send + Sync {
    fn channel_id(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), SendError>;
}

/// Session that forwards text into an unbounded channel.
///
/// Used by the WebSocket transport (one per socket) and by tests, which keep
/// the receiving end.
pub struct ChannelSession {
    channel_id: String,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSession {
    pub fn new(channel_id: impl Into<String>, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            tx,
        }
    }

    /// Create a session together with the receiver of everything sent to it
    pub fn pair(channel_id: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(channel_id, tx)), rx)
    }
}

#[async_trait]
impl Session for ChannelSession {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    async fn send(&self, text: &str) -> Result<(), SendError> {
        self.tx
            .send(text.to_string())
            .map_err(|_| SendError::Closed(self.channel_id.clone()))
    }
}

struct GroupSession {
    session: Arc<dyn Session>,
    stamped: Instant,
}

/// Which channels a game may currently broadcast on.
///
/// Group sessions are kept in insertion order, at most one per channel, and
/// expire once older than `expiry`. Private sessions never expire; the latest
/// registration for a participant wins.
pub struct SessionRegistry {
    group: Vec<GroupSession>,
    private: HashMap<UserId, Arc<dyn Session>>,
    expiry: Duration,
}

impl SessionRegistry {
    pub fn new(expiry: Duration) -> Self {
        Self {
            group: Vec::new(),
            private: HashMap::new(),
            expiry,
        }
    }

    /// Append a group session stamped now, without deduplication
    pub fn register_group(&mut self, session: Arc<dyn Session>) {
        self.group.push(GroupSession {
            session,
            stamped: Instant::now(),
        });
    }

    /// Prune stale entries, then restamp the session's channel in place or append it
    pub fn refresh_group(&mut self, session: Arc<dyn Session>) {
        self.prune();
        let now = Instant::now();
        match self
            .group
            .iter_mut()
            .find(|g| g.session.channel_id() == session.channel_id())
        {
            Some(existing) => {
                existing.session = session;
                existing.stamped = now;
            }
            None => self.group.push(GroupSession {
                session,
                stamped: now,
            }),
        }
    }

    pub fn register_private(&mut self, user_id: &str, session: Arc<dyn Session>) {
        self.private.insert(user_id.to_string(), session);
    }

    /// Oldest still-valid group session. Does not restamp it.
    pub fn group_session(&mut self) -> Option<Arc<dyn Session>> {
        self.prune();
        self.group.first().map(|g| g.session.clone())
    }

    pub fn private_session(&self, user_id: &str) -> Option<Arc<dyn Session>> {
        self.private.get(user_id).cloned()
    }

    /// Channel ids of the group sessions, oldest first (including stale ones)
    pub fn group_channels(&self) -> Vec<String> {
        self.group
            .iter()
            .map(|g| g.session.channel_id().to_string())
            .collect()
    }

    pub fn clear(&mut self) {
        self.group.clear();
        self.private.clear();
    }

    fn prune(&mut self) {
        let now = Instant::now();
        let expiry = self.expiry;
        self.group
            .retain(|g| now.saturating_duration_since(g.stamped) < expiry);
    }
}
