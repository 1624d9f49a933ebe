//! WebSocket endpoint. Every connection receives the global event stream;
//! clients opt into tracking rooms with join/leave control messages.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::notify::OrderEvent;
use crate::state::AppState;

/// Client→server control messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum Control {
    #[serde(rename = "join-tracking-room")]
    Join {
        #[serde(rename = "codigo")]
        code: String,
    },
    #[serde(rename = "leave-tracking-room")]
    Leave {
        #[serde(rename = "codigo")]
        code: String,
    },
}

pub(crate) async fn upgrade(
    State(st): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(st, socket))
}

async fn handle_socket(st: Arc<AppState>, socket: WebSocket) {
    let conn_id = Uuid::new_v4();
    let mut global = st.notifier.subscribe_global();
    // One sender shared by every room this connection joins.
    let (room_tx, mut room_rx) = mpsc::unbounded_channel::<OrderEvent>();
    let (mut sink, mut stream) = socket.split();

    tracing::debug!(%conn_id, "ws connected");

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Control>(&text) {
                            Ok(Control::Join { code }) => {
                                let code = code.trim().to_ascii_uppercase();
                                st.notifier.join_as(&code, conn_id, room_tx.clone()).await;
                                tracing::debug!(%conn_id, code, "joined tracking room");
                            }
                            Ok(Control::Leave { code }) => {
                                let code = code.trim().to_ascii_uppercase();
                                st.notifier.leave(&code, conn_id).await;
                                tracing::debug!(%conn_id, code, "left tracking room");
                            }
                            Err(err) => {
                                tracing::debug!(%conn_id, error = %err, "ignoring ws message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(%conn_id, error = %err, "ws receive error");
                        break;
                    }
                }
            }
            event = room_rx.recv() => {
                // The connection holds room_tx, so recv never yields None here.
                let Some(event) = event else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }
            event = global.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%conn_id, skipped, "ws subscriber lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    st.notifier.disconnect(conn_id).await;
    tracing::debug!(%conn_id, "ws disconnected");
}

async fn send_event(
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    event: &OrderEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).map_err(axum::Error::new)?;
    sink.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_parse_join_and_leave() {
        let join: Control =
            serde_json::from_str(r#"{"action":"join-tracking-room","codigo":"ab12c"}"#).unwrap();
        assert!(matches!(join, Control::Join { ref code } if code == "ab12c"));

        let leave: Control =
            serde_json::from_str(r#"{"action":"leave-tracking-room","codigo":"AB12C"}"#).unwrap();
        assert!(matches!(leave, Control::Leave { ref code } if code == "AB12C"));
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert!(serde_json::from_str::<Control>(r#"{"action":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<Control>("not json").is_err());
    }
}
