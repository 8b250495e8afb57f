use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        Bytes, Message, Utf8Bytes,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use uuid::Uuid;

use crate::api::{
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, SchemaType, Serialize},
};
use crate::clock;
use crate::server::{
    ServerResult,
    error::ServerError,
    protocol::NetworkProtocol,
    runtime::GameCoordinator,
    turns::REJECT_REASON,
};

pub struct WebSocketProtocol {
    addr: String,
    bound: Option<oneshot::Sender<SocketAddr>>,
}

impl WebSocketProtocol {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            bound: None,
        }
    }

    /// Report the bound address once listening. Lets callers bind port 0.
    pub fn notify_bound(mut self, bound: oneshot::Sender<SocketAddr>) -> Self {
        self.bound = Some(bound);
        self
    }
}

impl NetworkProtocol for WebSocketProtocol {
    async fn run<S>(
        mut self,
        coordinator: Arc<GameCoordinator<S>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ServerResult
    where
        S: Schema + Send + Sync + 'static,
        ClientMessage: Deserialize<S>,
        ServerMessage: Serialize<S>,
    {
        let listener = TcpListener::bind(self.addr.as_str())
            .await
            .map_err(ServerError::BindFailure)?;
        let local_addr = listener.local_addr().map_err(ServerError::BindFailure)?;
        if let Some(bound) = self.bound.take() {
            let _ = bound.send(local_addr);
        }
        log::info!("SERVER listening on {local_addr}");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            log::debug!("SERVER tcp connection from {peer}");
                            tokio::spawn(handle_connection::<S>(
                                stream,
                                Arc::clone(&coordinator),
                                shutdown.clone(),
                            ));
                        }
                        Err(err) => log::warn!("SERVER accept failed: {err}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Listener closed; readers observe the same signal. Give writer
        // queues a bounded drain before returning.
        drop(listener);
        tokio::time::sleep(Duration::from_millis(200)).await;
        log::info!("SERVER stopped");
        Ok(())
    }
}

async fn handle_connection<S>(
    stream: TcpStream,
    coordinator: Arc<GameCoordinator<S>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Schema + Send + Sync + 'static,
    ClientMessage: Deserialize<S>,
    ServerMessage: Serialize<S>,
{
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(err) => {
            log::debug!("SERVER websocket handshake failed: {err}");
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let client_id = Uuid::new_v4().to_string();
    let mut outbound = match coordinator.admit(client_id.clone()) {
        Ok(outbound) => outbound,
        Err(_) => {
            log::info!("SERVER rejecting connection: {REJECT_REASON}");
            let _ = write
                .send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static(REJECT_REASON),
                })))
                .await;
            return;
        }
    };

    let writer = tokio::spawn(async move {
        while let Some(raw_message) = outbound.recv().await {
            let message = match S::schema_type() {
                SchemaType::Text => Message::Text(
                    Utf8Bytes::try_from(raw_message)
                        .expect("Should encoded messages always be valid UTF-8"),
                ),
                SchemaType::Binary => Message::Binary(raw_message.into()),
            };
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            next = read.next() => {
                match next {
                    Some(Ok(message)) => {
                        let buffer: Vec<u8> = match message {
                            Message::Binary(bytes) => bytes.into(),
                            Message::Text(text) => Bytes::from(text).into(),
                            Message::Close(_) => break,
                            _ => continue,
                        };
                        coordinator.handle_message(&client_id, &buffer, clock::epoch_ms());
                    }
                    Some(Err(err)) => {
                        log::debug!("SERVER read error from {client_id}: {err}");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    coordinator.handle_disconnect(&client_id);
    writer.abort();
    log::info!("SERVER client {client_id} disconnected");
}
