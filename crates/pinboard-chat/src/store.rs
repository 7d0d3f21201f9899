use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use pinboard_db::Database;
use pinboard_types::models::ChatMessage;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("storage failure: {0}")]
    Persistence(anyhow::Error),
}

/// Persistence for private chat messages. Rows are written once and never
/// updated or deleted; id and created_at are assigned here.
#[derive(Clone)]
pub struct MessageStore {
    db: Arc<Database>,
}

impl MessageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Durably store a message and return it as written. The body must be
    /// non-empty after trimming whitespace; it is stored verbatim. Callers
    /// must not emit any delivery event until this returns Ok.
    pub async fn append(
        &self,
        sender_id: i64,
        receiver_id: i64,
        body: &str,
    ) -> Result<ChatMessage, StoreError> {
        if body.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let stamp = pinboard_db::format_timestamp(Utc::now());
        // Round-trip through the stored representation so the echo compares
        // equal to what a later history read returns
        let created_at = pinboard_db::parse_timestamp(&stamp);

        let db = self.db.clone();
        let stored_body = body.to_string();

        // rusqlite is blocking; run the insert off the async runtime
        let id = tokio::task::spawn_blocking(move || {
            db.insert_chat_message(sender_id, receiver_id, &stored_body, &stamp)
        })
        .await
        .map_err(|e| StoreError::Persistence(anyhow::anyhow!("insert task failed: {e}")))?
        .map_err(StoreError::Persistence)?;

        Ok(ChatMessage {
            id,
            sender_id,
            receiver_id,
            body: body.to_string(),
            created_at,
        })
    }

    /// Single-snapshot read of the conversation between two users, in both
    /// directions, ascending by creation time with id breaking ties.
    pub async fn history(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let db = self.db.clone();
        let rows = tokio::task::spawn_blocking(move || db.chat_history(user_a, user_b))
            .await
            .map_err(|e| StoreError::Persistence(anyhow::anyhow!("history task failed: {e}")))?
            .map_err(StoreError::Persistence)?;

        Ok(rows
            .into_iter()
            .map(|row| ChatMessage {
                id: row.id,
                sender_id: row.sender_id,
                receiver_id: row.receiver_id,
                body: row.message,
                created_at: pinboard_db::parse_timestamp(&row.created_at),
            })
            .collect())
    }
}
