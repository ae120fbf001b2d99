use futures_channel::mpsc::unbounded;
use futures_util::{future, pin_mut, StreamExt, TryStreamExt};
use log::{info, warn};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::handlers::command_handler::{execute_authorized_command, execute_unauthorized_command};
use crate::helpers::parse_message;
use crate::models::communication::{ClientMessage, Response};
use crate::server_messages::{send_message, PeerMap};
use crate::state::GameState;

/// One task per client connection: accept the WebSocket, register the reply
/// channel under a fresh connection id, then dispatch every incoming command
/// until the peer hangs up.
pub async fn handle_connection(
    state: GameState,
    peers: PeerMap,
    raw_stream: TcpStream,
    addr: SocketAddr,
) {
    info!("Incoming TCP connection from: {}", &addr);

    let ws_stream = match tokio_tungstenite::accept_async(raw_stream).await {
        Ok(stream) => stream,
        Err(error) => {
            warn!("Handshake with {} error: {}", addr, error);
            return;
        }
    };
    info!("WebSocket connection established: {}", &addr);

    let connection_id = Uuid::new_v4().to_string();
    let (tx, rx) = unbounded();
    peers.lock().unwrap().insert(connection_id.clone(), tx);

    let (outgoing, incoming) = ws_stream.split();

    let dispatch_incoming = incoming.try_for_each(|msg| {
        match parse_message(&msg) {
            Ok(ClientMessage::UnauthorizedCommand(command)) => {
                execute_unauthorized_command(command, &peers, &connection_id)
            }
            Ok(ClientMessage::CommandTokenPair(pair)) => {
                execute_authorized_command(pair, &state, &peers, &connection_id)
            }
            Err(error) => {
                warn!("Error parsing command: {}", error);
                let response = Response::errorResponse {
                    code: "BAD_REQUEST".to_string(),
                    errorText: error.to_string(),
                };
                send_message(response, &peers, &connection_id);
            }
        }
        future::ok(())
    });

    let forward_outgoing = rx.map(Ok).forward(outgoing);

    pin_mut!(dispatch_incoming, forward_outgoing);
    future::select(dispatch_incoming, forward_outgoing).await;

    info!("Connection {} disconnected", &addr);
    peers.lock().unwrap().remove(&connection_id);
}
