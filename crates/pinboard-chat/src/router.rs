use tracing::debug;

use pinboard_types::events::ServerEvent;
use pinboard_types::models::ChatMessage;

use crate::presence::PresenceTable;

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Forwarded to the receiver's live connection
    Delivered,
    /// Receiver offline; the stored message waits for a later fetch
    Buffered,
}

/// Forwards already-persisted messages to online receivers.
#[derive(Clone)]
pub struct Router {
    presence: PresenceTable,
}

impl Router {
    pub fn new(presence: PresenceTable) -> Self {
        Self { presence }
    }

    /// Fire-and-forget forward, no delivery confirmation. Callers must have
    /// persisted the message first.
    pub async fn deliver(&self, receiver_id: i64, message: ChatMessage) -> Delivery {
        match self.presence.lookup(receiver_id).await {
            Some(handle) => {
                handle.send(ServerEvent::Message(message));
                Delivery::Delivered
            }
            None => {
                debug!("user {} has no live connection, message buffered", receiver_id);
                Delivery::Buffered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::ConnectionHandle;
    use chrono::Utc;

    fn message() -> ChatMessage {
        ChatMessage {
            id: 1,
            sender_id: 1,
            receiver_id: 2,
            body: "hi".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_online_receiver() {
        let presence = PresenceTable::new();
        let router = Router::new(presence.clone());
        let (handle, mut rx) = ConnectionHandle::new();
        presence.register(2, handle).await;

        let outcome = router.deliver(2, message()).await;

        assert_eq!(outcome, Delivery::Delivered);
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Message(m) if m.body == "hi"));
    }

    #[tokio::test]
    async fn buffers_for_offline_receiver() {
        let presence = PresenceTable::new();
        let router = Router::new(presence);

        assert_eq!(router.deliver(2, message()).await, Delivery::Buffered);
    }
}
