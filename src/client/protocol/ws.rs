use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Bytes, Message, Utf8Bytes, client::IntoClientRequest},
};

use crate::api::{
    error::WireError,
    message::ServerMessage,
    schema::{Deserialize, Schema, SchemaType},
};
use crate::client::{
    error::ClientError,
    protocol::{ClientProtocol, ClientProtocolHandle, GameEvent},
};

pub struct WebSocketClientProtocol {
    url: String,
}

impl WebSocketClientProtocol {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ClientProtocol for WebSocketClientProtocol {
    async fn connect<S>(&self) -> Result<ClientProtocolHandle, ClientError>
    where
        S: Schema + Send + Sync + 'static,
        ServerMessage: Deserialize<S>,
    {
        let request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|_| ClientError::ConnectionFailure)?;
        let (stream, _) = connect_async(request)
            .await
            .map_err(|_| ClientError::ConnectionFailure)?;

        let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
        let (event_tx, event_rx) = async_channel::unbounded::<GameEvent>();
        let (mut ws_writer, mut ws_reader) = stream.split();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        let Some(raw_message) = outbound else { break };
                        let message = match S::schema_type() {
                            SchemaType::Text => Message::Text(
                                Utf8Bytes::try_from(raw_message)
                                    .expect("Should encoded messages always be valid UTF-8"),
                            ),
                            SchemaType::Binary => Message::Binary(raw_message.into()),
                        };
                        if ws_writer.send(message).await.is_err() {
                            break;
                        }
                    }
                    inbound = ws_reader.next() => {
                        match inbound {
                            Some(Ok(message)) => {
                                let buffer: Vec<u8> = match message {
                                    Message::Binary(bytes) => bytes.into(),
                                    Message::Text(text) => Bytes::from(text).into(),
                                    Message::Close(frame) => {
                                        log::info!("CLIENT server closed connection: {frame:?}");
                                        break;
                                    }
                                    _ => continue,
                                };
                                match <ServerMessage as Deserialize<S>>::deserialize(&buffer) {
                                    Ok(decoded) => {
                                        if event_tx.send(GameEvent::Message(decoded)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(WireError::UnknownMessage { type_ }) => {
                                        log::debug!("CLIENT skipping unknown message `{type_}`");
                                    }
                                    Err(WireError::Decode) => {
                                        log::warn!("CLIENT dropping malformed server message");
                                    }
                                }
                            }
                            Some(Err(err)) => {
                                log::warn!("CLIENT transport error: {err}");
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }
            let _ = event_tx.send(GameEvent::Disconnected).await;
        });

        Ok(ClientProtocolHandle {
            outbound_tx,
            event_rx,
        })
    }
}
