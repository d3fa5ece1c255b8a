//! WebSocket upgrade and per-connection read/write loop.
//!
//! Observers connect at `GET /channels/{client_id}`. The channel is
//! engine-to-observer only: inbound messages are read (so close frames and
//! backpressure work) but otherwise ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use pharos_core::ClientId;

use super::broadcast::BroadcastManager;
use crate::server::AppState;

/// GET /channels/{client_id} — upgrade to a guidance envelope stream.
pub async fn channel_handler(
    Path(client_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let client_id = ClientId::from_string(client_id);
    ws.on_upgrade(move |socket| {
        serve_socket(socket, client_id, state.broadcast, state.client_buffer)
    })
}

async fn serve_socket(
    socket: WebSocket,
    client_id: ClientId,
    broadcast: Arc<BroadcastManager>,
    client_buffer: usize,
) {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(client_buffer);
    let connection = Arc::new(super::connection::ClientConnection::new(
        client_id.clone(),
        tx,
    ));
    broadcast.add(connection).await;
    tracing::info!(client_id = %client_id, "observer connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // observers have nothing to tell the engine over this channel
                Some(Ok(_)) => {}
            },
        }
    }

    broadcast.remove(&client_id).await;
    tracing::info!(client_id = %client_id, "observer disconnected");
}
