//! Connectivity events socket
//!
//! Clients open `GET /events` to learn that the server is reachable. The
//! socket carries no payload; connects and disconnects are logged.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};

pub async fn events(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    tracing::info!("Client connected");

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {},
            Err(e) => {
                tracing::debug!(error = %e, "Events socket error");
                break;
            },
        }
    }

    tracing::info!("Client disconnected");
}
