use std::marker::PhantomData;
use std::time::Duration;

use crate::api::{
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, Serialize},
};
use crate::client::{
    error::ClientError,
    protocol::{ClientProtocol, ClientProtocolHandle, GameEvent},
};
use crate::config::SyncSettings;

pub mod error;
pub mod executor;
pub mod protocol;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: f64 = 1.5;
const BACKOFF_CAP: Duration = Duration::from_secs(30);

pub type ClientResult = Result<(), ClientError>;

/// Connection handle for one peer. Network I/O runs on its own task; this
/// side only enqueues outbound messages and drains inbound events.
pub struct LockstepClient<S>
where
    S: Schema,
{
    handle: ClientProtocolHandle,
    _schema: PhantomData<S>,
}

impl<S> LockstepClient<S>
where
    S: Schema + Send + Sync + 'static,
    ClientMessage: Serialize<S>,
    ServerMessage: Deserialize<S>,
{
    /// Connect with exponential backoff: base 1.0 s, factor 1.5, capped at
    /// 30 s, giving up after `max_retries` attempts.
    pub async fn connect<P>(protocol: P, settings: &SyncSettings) -> Result<Self, ClientError>
    where
        P: ClientProtocol,
    {
        let mut delay = BACKOFF_BASE;
        for attempt in 1..=settings.max_retries {
            match protocol.connect::<S>().await {
                Ok(handle) => {
                    log::info!("CLIENT connected on attempt {attempt}");
                    return Ok(Self {
                        handle,
                        _schema: PhantomData,
                    });
                }
                Err(err) => {
                    log::warn!(
                        "CLIENT connection attempt {attempt}/{} failed: {err}",
                        settings.max_retries
                    );
                    if attempt == settings.max_retries {
                        break;
                    }
                    tokio::time::sleep(delay).await;
                    delay = Duration::from_secs_f64(
                        (delay.as_secs_f64() * BACKOFF_FACTOR).min(BACKOFF_CAP.as_secs_f64()),
                    );
                }
            }
        }
        Err(ClientError::RetriesExhausted)
    }

    pub fn send(&self, message: &ClientMessage) -> ClientResult {
        self.handle
            .outbound_tx
            .send(Serialize::<S>::serialize(message))
            .map_err(|_| ClientError::NotRunning)
    }

    pub fn try_event(&self) -> Option<GameEvent> {
        self.handle.try_event()
    }

    pub async fn next_event(&self) -> Option<GameEvent> {
        self.handle.next_event().await
    }
}
