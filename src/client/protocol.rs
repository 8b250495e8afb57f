use tokio::sync::mpsc::UnboundedSender;

use crate::api::{
    message::ServerMessage,
    schema::{Deserialize, Schema},
};
use crate::client::error::ClientError;

#[cfg(feature = "ws")]
pub mod ws;

/// Everything the update scheduler consumes arrives as one of these; the
/// receiver task owns the socket and never calls back into game code.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Message(ServerMessage),
    Disconnected,
}

pub struct ClientProtocolHandle {
    pub(crate) outbound_tx: UnboundedSender<Vec<u8>>,
    pub(crate) event_rx: async_channel::Receiver<GameEvent>,
}

impl ClientProtocolHandle {
    /// Drain one pending event without blocking the update scheduler.
    pub fn try_event(&self) -> Option<GameEvent> {
        self.event_rx.try_recv().ok()
    }

    pub async fn next_event(&self) -> Option<GameEvent> {
        self.event_rx.recv().await.ok()
    }
}

pub trait ClientProtocol {
    fn connect<S>(
        &self,
    ) -> impl Future<Output = Result<ClientProtocolHandle, ClientError>>
    where
        S: Schema + Send + Sync + 'static,
        ServerMessage: Deserialize<S>;
}
