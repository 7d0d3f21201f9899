use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use pinboard_types::events::ServerEvent;

/// Sending half of a live connection's outbound queue, tagged with an opaque
/// connection identity. The receiving half is drained by the connection's
/// send task; the transport owns the socket itself.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: Uuid::new_v4(), tx }, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fire-and-forget: a send to a connection that is already gone is
    /// dropped, its result discarded.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

/// Process-wide map from user id to that user's single live connection.
/// Mutated only on authenticate and disconnect; shared by handle, never a
/// hidden global.
#[derive(Clone)]
pub struct PresenceTable {
    inner: Arc<RwLock<HashMap<i64, ConnectionHandle>>>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bind a user to a connection. Last authenticated connection wins: an
    /// existing entry for the user is overwritten.
    pub async fn register(&self, user_id: i64, handle: ConnectionHandle) {
        self.inner.write().await.insert(user_id, handle);
    }

    pub async fn lookup(&self, user_id: i64) -> Option<ConnectionHandle> {
        self.inner.read().await.get(&user_id).cloned()
    }

    /// Remove the user's entry only while `conn_id` still owns it. A closing
    /// connection that lost a reconnect race must not evict its successor's
    /// registration.
    pub async fn deregister(&self, user_id: i64, conn_id: Uuid) {
        let mut map = self.inner.write().await;
        if map.get(&user_id).is_some_and(|h| h.id == conn_id) {
            map.remove(&user_id);
        }
    }
}

impl Default for PresenceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_connect_wins() {
        let table = PresenceTable::new();
        let (c1, _rx1) = ConnectionHandle::new();
        let (c2, _rx2) = ConnectionHandle::new();

        table.register(1, c1.clone()).await;
        table.register(1, c2.clone()).await;

        assert_eq!(table.lookup(1).await.unwrap().id(), c2.id());
    }

    #[tokio::test]
    async fn deregister_is_guarded_by_connection_id() {
        let table = PresenceTable::new();
        let (c1, _rx1) = ConnectionHandle::new();
        let (c2, _rx2) = ConnectionHandle::new();

        table.register(1, c1.clone()).await;
        table.register(1, c2.clone()).await;

        // The old connection's teardown raced the reconnect: no-op
        table.deregister(1, c1.id()).await;
        assert_eq!(table.lookup(1).await.unwrap().id(), c2.id());

        // The live connection's teardown removes the entry
        table.deregister(1, c2.id()).await;
        assert!(table.lookup(1).await.is_none());
    }

    #[tokio::test]
    async fn deregister_unknown_user_is_noop() {
        let table = PresenceTable::new();
        let (c1, _rx1) = ConnectionHandle::new();
        table.deregister(42, c1.id()).await;
        assert!(table.lookup(42).await.is_none());
    }
}
