use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::api::AppState;
use super::models::{Issue, IssueStatus};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

/// Board mutation events published to every connected client. Each
/// mutating handler broadcasts exactly one of these after its write
/// succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    IssueCreated {
        issue: Issue,
    },
    IssueUpdated {
        issue: Issue,
    },
    IssueMoved {
        issue_id: i64,
        from_status: IssueStatus,
        to_status: IssueStatus,
    },
    IssueDeleted {
        issue_id: i64,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    let rx = state.ws_tx.subscribe();
    run_socket_loop(sender, receiver, rx).await;
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Combines broadcast forwarding, client message receiving, and periodic
/// ping/pong health checking into a single select loop. If no Pong is
/// received within [`PONG_TIMEOUT`] after a Ping is sent, the connection
/// is considered dead and the loop exits.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    // Connection is dead — no pong received in time
                    break;
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Broadcast forwarding ────────────────────────────────
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed some messages; continue receiving
                        continue;
                    }
                }
            }

            // ── Client messages (pong, close, etc.) ─────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ignore other messages from client (Text, Binary, Ping)
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

// ── Broadcast helper ─────────────────────────────────────────────────

/// Serialize and broadcast a WsMessage to all connected WebSocket clients.
/// Returns silently even if no clients are connected.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &WsMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let _ = tx.send(json); // Ignore error if no receivers
        }
        Err(e) => {
            tracing::warn!("Failed to serialize WsMessage: {}", e);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::models::{IssueType, Priority};

    fn issue() -> Issue {
        Issue {
            id: 1,
            issue_key: "APP-0001".to_string(),
            summary: "Test".to_string(),
            description: "Desc".to_string(),
            acceptance_criteria: "AC".to_string(),
            issue_type: IssueType::Story,
            priority: Priority::P2,
            story_points: None,
            start_date: None,
            due_date: None,
            sprint: None,
            status: IssueStatus::Backlog,
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_issue_created_serialization() {
        let msg = WsMessage::IssueCreated { issue: issue() };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"IssueCreated\""));
        assert!(json.contains("\"data\""));
        assert!(json.contains("\"issue_key\":\"APP-0001\""));
    }

    #[test]
    fn test_issue_moved_serialization() {
        let msg = WsMessage::IssueMoved {
            issue_id: 5,
            from_status: IssueStatus::Released,
            to_status: IssueStatus::Sprint,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"IssueMoved\""));
        assert!(json.contains("\"issue_id\":5"));
        assert!(json.contains("\"from_status\":\"released\""));
        assert!(json.contains("\"to_status\":\"sprint\""));
    }

    #[test]
    fn test_issue_deleted_serialization() {
        let msg = WsMessage::IssueDeleted { issue_id: 42 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"IssueDeleted\""));
        assert!(json.contains("\"issue_id\":42"));
    }

    #[test]
    fn test_roundtrip_deserialization() {
        let msg = WsMessage::IssueMoved {
            issue_id: 10,
            from_status: IssueStatus::Backlog,
            to_status: IssueStatus::Done,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: WsMessage = serde_json::from_str(&json).unwrap();
        match deserialized {
            WsMessage::IssueMoved {
                issue_id,
                from_status,
                to_status,
            } => {
                assert_eq!(issue_id, 10);
                assert_eq!(from_status, IssueStatus::Backlog);
                assert_eq!(to_status, IssueStatus::Done);
            }
            _ => panic!("Expected IssueMoved variant"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_all_subscribers() {
        let (tx, _) = broadcast::channel::<String>(16);
        let mut rx1 = tx.subscribe();
        let mut rx2 = tx.subscribe();

        broadcast_message(&tx, &WsMessage::IssueDeleted { issue_id: 1 });

        let received1 = rx1.recv().await.unwrap();
        let received2 = rx2.recv().await.unwrap();
        assert!(received1.contains("IssueDeleted"));
        assert_eq!(received1, received2);
    }

    #[tokio::test]
    async fn test_broadcast_no_receivers_does_not_panic() {
        let (tx, _) = broadcast::channel::<String>(16);
        broadcast_message(&tx, &WsMessage::IssueDeleted { issue_id: 1 });
    }

    #[test]
    fn test_keepalive_constants() {
        // PONG_TIMEOUT must be greater than PING_INTERVAL so we don't
        // immediately consider a fresh connection dead.
        assert!(PONG_TIMEOUT > PING_INTERVAL);
    }
}
