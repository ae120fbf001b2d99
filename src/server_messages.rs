use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures_channel::mpsc::UnboundedSender;
use log::warn;
use tungstenite::protocol::Message;

use crate::models::communication::Response;

pub type Tx = UnboundedSender<Message>;
pub type PeerMap = Arc<Mutex<HashMap<String, Tx>>>;

/// Replies to exactly one connection. Clients poll; nothing is ever pushed
/// to anyone who did not just ask.
pub fn send_message(response: Response, peer_map: &PeerMap, connection_id: &str) {
    let text = match serde_json::to_string(&response) {
        Ok(text) => text,
        Err(error) => {
            warn!("Could not serialize response: {}", error);
            return;
        }
    };

    let peers = peer_map.lock().unwrap();
    match peers.get(connection_id) {
        Some(recipient) => {
            if recipient.unbounded_send(Message::Text(text)).is_err() {
                warn!("Connection {} closed before reply", connection_id);
            }
        }
        None => warn!("No live connection {}", connection_id),
    }
}
