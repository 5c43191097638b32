//! WebSocket transport for the relay protocol

mod connection;
mod handler;

pub use connection::{Outbox, WsConnection, write_loop};
pub use handler::handle_socket;

use crate::state::RelayState;
use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::Response,
};
use std::{net::SocketAddr, sync::Arc};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let client_ip = addr.ip().to_string();

    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, client_ip))
}
