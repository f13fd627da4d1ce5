//! The push channel (§4.10/§6): one task per connected subscriber. A
//! connection authenticates with its api key at handshake, receives an
//! immediate `position_snapshot` at seq 0, then streams the live event bus
//! filtered to events owned by its team plus every unfiltered `phase_change`,
//! renumbered into a sequence local to this connection as each one is sent.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::events::EventPayload;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct AuthFrame {
    api_key: String,
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let Some(Ok(Message::Text(text))) = receiver.next().await else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };
    let Ok(frame) = serde_json::from_str::<AuthFrame>(&text) else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };
    let Ok((team_id, _role)) = state.teams.authenticate(&frame.api_key) else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    crate::metrics::set_ws_connections(1);

    let snapshot = state.positions.snapshot(team_id);
    let ack = crate::events::Event {
        seq: 0,
        timestamp: chrono::Utc::now(),
        payload: EventPayload::PositionSnapshot { team_id, positions: snapshot },
    };
    if let Ok(json) = serde_json::to_string(&ack) {
        if sender.send(Message::Text(json)).await.is_err() {
            crate::metrics::set_ws_connections(-1);
            return;
        }
    }

    let mut events = state.events.subscribe();
    // The bus's own `seq` numbers the publish order across every connection,
    // not what a single client sees once its filter drops events meant for
    // other teams. Renumber here so a client can tell a filtered-out event
    // apart from an actual broadcast-lag drop by watching for gaps in this
    // counter alone.
    let mut conn_seq: u64 = 0;
    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
            event = events.recv() => {
                match event {
                    Ok(mut event) => {
                        if !relevant_to(&event.payload, team_id) {
                            continue;
                        }
                        conn_seq += 1;
                        event.seq = conn_seq;
                        crate::metrics::record_ws_event_published();
                        let Ok(json) = serde_json::to_string(&event) else { continue };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        crate::metrics::record_ws_subscriber_lag(skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    crate::metrics::set_ws_connections(-1);
}

fn relevant_to(payload: &EventPayload, team_id: uuid::Uuid) -> bool {
    match payload.team_id() {
        Some(owner) => owner == team_id,
        None => true,
    }
}
