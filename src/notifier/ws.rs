//! WebSocket endpoint for viewers.
//!
//! Each connection gets a bounded outbound channel drained by its own
//! writer task. Whatever ends the connection, it is removed from every
//! subscriber set before the handler returns.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::protocol::{ClientMessage, ServerMessage};
use super::registry::{ChannelSink, ConnectionId, SubscriptionRegistry, ViewerSink};

/// Buffered updates per viewer before deliveries start failing
const OUTBOUND_BUFFER: usize = 64;

/// Router exposing `GET /ws`
pub fn router(registry: Arc<SubscriptionRegistry>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(registry)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<SubscriptionRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<SubscriptionRegistry>) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "🔌 Viewer connected");

    let (mut outbound, mut inbound) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let sink: Arc<dyn ViewerSink> = Arc::new(ChannelSink::new(tx));

    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Could not encode status update");
                    continue;
                }
            };
            if outbound.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let reader = async {
        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    handle_client_text(&registry, connection_id, &sink, &text).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(connection_id = %connection_id, error = %e, "Viewer read failed");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = reader => {}
        _ = &mut writer => {
            debug!(connection_id = %connection_id, "Viewer writer finished");
        }
    }

    let removed = registry.unsubscribe_all(connection_id).await;
    writer.abort();
    info!(connection_id = %connection_id, subscriptions = removed, "Viewer disconnected");
}

async fn handle_client_text(
    registry: &SubscriptionRegistry,
    connection_id: ConnectionId,
    sink: &Arc<dyn ViewerSink>,
    text: &str,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { subject_id }) => {
            registry
                .subscribe(&subject_id, connection_id, Arc::clone(sink))
                .await;
        }
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "Ignoring unrecognised viewer message");
        }
    }
}
