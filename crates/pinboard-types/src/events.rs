use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// Requests sent FROM client TO server over the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Authenticate the socket connection with a bearer token
    Authenticate { token: String },

    /// Send a private message to another user
    #[serde(rename_all = "camelCase")]
    PrivateMessage {
        receiver_username: String,
        message: String,
    },

    /// Fetch the stored conversation with another user
    #[serde(rename_all = "camelCase")]
    FetchMessages { other_user_id: i64 },
}

/// Events sent FROM server TO client over the chat socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authentication succeeded; the session is bound to this identity
    #[serde(rename_all = "camelCase")]
    Authenticated { user_id: i64, username: String },

    /// Authentication failed; the server closes the connection after this
    AuthError { reason: String },

    /// A chat message — the echo to the sender, or a live delivery to the
    /// receiver
    Message(ChatMessage),

    /// The full stored conversation requested via fetch_messages
    PreviousMessages { messages: Vec<ChatMessage> },

    /// A per-request failure; the session stays open
    ChatError { reason: ChatErrorReason },
}

/// Why a send or fetch was rejected. Reported only to the requesting
/// connection; none of these end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorReason {
    /// Request arrived before the session authenticated
    Unauthorized,
    /// receiverUsername did not resolve to a known user
    ReceiverNotFound,
    /// Message body was empty after trimming
    EmptyMessage,
    /// The store was unavailable or timed out
    Storage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_wire_names() {
        let ev: ClientEvent = serde_json::from_str(
            r#"{"type":"private_message","data":{"receiverUsername":"bob","message":"hi"}}"#,
        )
        .unwrap();
        match ev {
            ClientEvent::PrivateMessage {
                receiver_username,
                message,
            } => {
                assert_eq!(receiver_username, "bob");
                assert_eq!(message, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let ev: ClientEvent =
            serde_json::from_str(r#"{"type":"fetch_messages","data":{"otherUserId":7}}"#).unwrap();
        assert!(matches!(ev, ClientEvent::FetchMessages { other_user_id: 7 }));
    }

    #[test]
    fn chat_error_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ServerEvent::ChatError {
            reason: ChatErrorReason::Unauthorized,
        })
        .unwrap();
        assert!(json.contains(r#""reason":"unauthorized""#), "{json}");
    }
}
