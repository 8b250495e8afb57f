use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, Serialize},
};
use crate::server::{ServerResult, runtime::GameCoordinator};

#[cfg(feature = "ws")]
pub mod ws;

/// Transport in front of the coordinator. Implementations own the listener
/// lifecycle: accept connections, pump decoded bytes into the coordinator,
/// and tear everything down when the shutdown signal flips.
pub trait NetworkProtocol {
    fn run<S>(
        self,
        coordinator: Arc<GameCoordinator<S>>,
        shutdown: watch::Receiver<bool>,
    ) -> impl Future<Output = ServerResult>
    where
        S: Schema + Send + Sync + 'static,
        ClientMessage: Deserialize<S>,
        ServerMessage: Serialize<S>;
}
