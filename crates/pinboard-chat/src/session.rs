use tracing::{debug, info, warn};

use pinboard_types::events::{ChatErrorReason, ClientEvent, ServerEvent};
use pinboard_types::models::Principal;

use crate::ChatState;
use crate::presence::ConnectionHandle;
use crate::router::Delivery;
use crate::store::StoreError;

/// Lifecycle of one chat connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Principal),
    Closed,
}

/// What the transport loop should do after an event is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Close,
}

/// Per-connection state machine. Responses to the requesting client go
/// through the session's own connection handle; delivery to the peer goes
/// through the router.
pub struct Session {
    conn: ConnectionHandle,
    state: SessionState,
    chat: ChatState,
}

impl Session {
    pub fn new(conn: ConnectionHandle, chat: ChatState) -> Self {
        Self {
            conn,
            state: SessionState::Unauthenticated,
            chat,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// Advance the state machine by one client event. Every (state, request)
    /// pair is enumerated here, so a request that is illegal in the current
    /// state is a checked error rather than an accidental no-op.
    pub async fn handle_event(&mut self, event: ClientEvent) -> Control {
        match (self.state.clone(), event) {
            // Closed is terminal; no further events are processed
            (SessionState::Closed, _) => Control::Close,

            (SessionState::Unauthenticated, ClientEvent::Authenticate { token }) => {
                self.authenticate(&token).await
            }
            (SessionState::Authenticated(_), ClientEvent::Authenticate { .. }) => {
                debug!("ignoring authenticate on an already-authenticated session");
                Control::Continue
            }

            (
                SessionState::Unauthenticated,
                ClientEvent::PrivateMessage { .. } | ClientEvent::FetchMessages { .. },
            ) => {
                self.conn.send(ServerEvent::ChatError {
                    reason: ChatErrorReason::Unauthorized,
                });
                Control::Continue
            }

            (
                SessionState::Authenticated(principal),
                ClientEvent::PrivateMessage {
                    receiver_username,
                    message,
                },
            ) => {
                if let Err(reason) = self
                    .send_message(&principal, &receiver_username, &message)
                    .await
                {
                    self.conn.send(ServerEvent::ChatError { reason });
                }
                Control::Continue
            }

            (SessionState::Authenticated(principal), ClientEvent::FetchMessages { other_user_id }) => {
                match self.chat.store.history(principal.id, other_user_id).await {
                    Ok(messages) => {
                        self.conn.send(ServerEvent::PreviousMessages { messages });
                    }
                    Err(e) => {
                        warn!("history fetch for user {} failed: {}", principal.id, e);
                        self.conn.send(ServerEvent::ChatError {
                            reason: ChatErrorReason::Storage,
                        });
                    }
                }
                Control::Continue
            }
        }
    }

    /// Transport disconnect. Deregistration is guarded by connection id, so
    /// a teardown racing a reconnect never evicts the newer registration.
    pub async fn handle_disconnect(&mut self) {
        if let SessionState::Authenticated(principal) = &self.state {
            self.chat
                .presence
                .deregister(principal.id, self.conn.id())
                .await;
            info!(
                "{} ({}) disconnected from chat",
                principal.username, principal.id
            );
        }
        self.state = SessionState::Closed;
    }

    async fn authenticate(&mut self, token: &str) -> Control {
        match self.chat.verifier.verify(token) {
            Ok(principal) => {
                self.chat
                    .presence
                    .register(principal.id, self.conn.clone())
                    .await;
                info!("{} ({}) authenticated on chat", principal.username, principal.id);
                self.conn.send(ServerEvent::Authenticated {
                    user_id: principal.id,
                    username: principal.username.clone(),
                });
                self.state = SessionState::Authenticated(principal);
                Control::Continue
            }
            Err(e) => {
                // The failure kind stays in the log; the client gets one
                // generic reason
                warn!("chat authentication failed: {}", e);
                self.conn.send(ServerEvent::AuthError {
                    reason: "authentication failed".to_string(),
                });
                self.state = SessionState::Closed;
                Control::Close
            }
        }
    }

    async fn send_message(
        &self,
        sender: &Principal,
        receiver_username: &str,
        body: &str,
    ) -> Result<(), ChatErrorReason> {
        let receiver_id = self
            .resolve_username(receiver_username)
            .await?
            .ok_or(ChatErrorReason::ReceiverNotFound)?;

        let message = self
            .chat
            .store
            .append(sender.id, receiver_id, body)
            .await
            .map_err(|e| match e {
                StoreError::EmptyMessage => ChatErrorReason::EmptyMessage,
                StoreError::Persistence(err) => {
                    warn!("failed to store chat message: {}", err);
                    ChatErrorReason::Storage
                }
            })?;

        // Persisted; now echo to the sender and forward to the receiver
        self.conn.send(ServerEvent::Message(message.clone()));
        if self.chat.router.deliver(receiver_id, message).await == Delivery::Buffered {
            debug!("receiver {} offline, message awaits fetch", receiver_id);
        }
        Ok(())
    }

    async fn resolve_username(&self, username: &str) -> Result<Option<i64>, ChatErrorReason> {
        let db = self.chat.db.clone();
        let name = username.to_string();
        tokio::task::spawn_blocking(move || db.resolve_username(&name))
            .await
            .map_err(|e| {
                warn!("receiver lookup task failed: {}", e);
                ChatErrorReason::Storage
            })?
            .map_err(|e| {
                warn!("receiver lookup failed: {}", e);
                ChatErrorReason::Storage
            })
    }
}
