use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use pinboard_types::events::ClientEvent;

use crate::ChatState;
use crate::presence::ConnectionHandle;
use crate::session::{Control, Session};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a connection may stay unauthenticated before it is closed.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the send task gets to flush queued events at teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Drive one WebSocket connection through its session state machine: queue
/// outbound events through a send task, parse inbound frames into client
/// events, and deregister presence on the way out.
pub async fn handle_socket(socket: WebSocket, chat: ChatState) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut outbound) = ConnectionHandle::new();
    let mut session = Session::new(handle, chat);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();

    // Forward queued events to the client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbound.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("dropping unserializable event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read events from the client until either side goes away
    {
        let auth_deadline = tokio::time::Instant::now() + AUTH_TIMEOUT;
        let recv_loop = async {
            loop {
                // An unauthenticated connection only gets AUTH_TIMEOUT to
                // present a token
                let next = if session.is_authenticated() {
                    receiver.next().await
                } else {
                    match tokio::time::timeout_at(auth_deadline, receiver.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!("connection did not authenticate in time, closing");
                            break;
                        }
                    }
                };

                let Some(Ok(msg)) = next else { break };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            if session.handle_event(event).await == Control::Close {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("bad chat event: {} -- raw: {}", e, &text[..text.len().min(200)]);
                        }
                    },
                    Message::Pong(_) => {
                        pong_received.store(true, Ordering::Release);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        };
        tokio::pin!(recv_loop);

        tokio::select! {
            _ = &mut send_task => {}
            _ = &mut recv_loop => {}
        }
    }

    // Deregister presence first so no new deliveries target this
    // connection; in-flight results are discarded at the closed queue
    session.handle_disconnect().await;

    // Dropping the session drops the last queue sender, letting the send
    // task flush anything still pending (such as a final auth_error)
    drop(session);
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut send_task).await.is_err() {
        send_task.abort();
    }
    debug!("chat socket closed");
}
