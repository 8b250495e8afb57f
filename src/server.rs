use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, Serialize},
};
use crate::config::SyncSettings;
use crate::server::{error::ServerError, protocol::NetworkProtocol, runtime::GameCoordinator};

pub mod error;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod turns;

pub type ServerResult = Result<(), ServerError>;

/// The lockstep relay server: admits a fixed cohort, schedules a
/// synchronized start, and broadcasts one finalized input frame per turn.
/// It owns no simulation; clients step their own worlds from the frames it
/// relays.
pub struct LockstepServer<N, S>
where
    N: NetworkProtocol,
    S: Schema,
{
    protocol: N,
    _schema: S,
    settings: SyncSettings,
    shutdown_tx: watch::Sender<bool>,
}

impl<N, S> LockstepServer<N, S>
where
    N: NetworkProtocol,
    S: Schema + Send + Sync + 'static,
{
    pub fn new(protocol: N, schema: S, settings: SyncSettings) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            protocol,
            _schema: schema,
            settings,
            shutdown_tx,
        }
    }

    /// Handle that stops the server from outside `run`: closes the
    /// listener, cancels connection readers, and lets in-flight sends drain
    /// within a bounded timeout.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    pub async fn run(self) -> ServerResult
    where
        ClientMessage: Deserialize<S>,
        ServerMessage: Serialize<S>,
    {
        let coordinator = Arc::new(GameCoordinator::<S>::new(self.settings.clone()));

        let ticker = tokio::spawn(runtime::run_tick_loop(
            Arc::clone(&coordinator),
            self.shutdown_tx.subscribe(),
        ));
        let result = self
            .protocol
            .run::<S>(coordinator, self.shutdown_tx.subscribe())
            .await;
        ticker.abort();
        result
    }
}

#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
