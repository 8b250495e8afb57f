use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::input::ClientId;

/// Registry of connected peers and their outbound sinks. Writer tasks drain
/// the receivers; everything here is a non-blocking enqueue, so one slow or
/// dead peer never stalls a broadcast to the others.
#[derive(Default)]
pub struct SessionManager {
    conns: RwLock<HashMap<ClientId, UnboundedSender<Vec<u8>>>>,
}

impl SessionManager {
    pub fn connect(&self, client_id: ClientId) -> UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        if let Ok(mut conns) = self.conns.write() {
            conns.insert(client_id, tx);
        }
        rx
    }

    pub fn disconnect(&self, client_id: &str) {
        if let Ok(mut conns) = self.conns.write() {
            conns.remove(client_id);
        }
    }

    pub fn send(&self, client_id: &str, raw_message: Vec<u8>) {
        if let Ok(conns) = self.conns.read()
            && let Some(conn) = conns.get(client_id)
        {
            let _ = conn.send(raw_message);
        }
    }

    pub fn broadcast(&self, raw_message: &[u8]) {
        if let Ok(conns) = self.conns.read() {
            for (client_id, conn) in conns.iter() {
                if conn.send(raw_message.to_vec()).is_err() {
                    log::trace!("SERVER dropping broadcast to closed peer {client_id}");
                }
            }
        }
    }

    pub fn connected(&self) -> usize {
        self.conns.read().map(|conns| conns.len()).unwrap_or(0)
    }
}
