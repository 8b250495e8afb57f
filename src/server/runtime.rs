use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::api::{
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, Serialize},
};
use crate::clock;
use crate::config::SyncSettings;
use crate::input::ClientId;
use crate::server::{
    session::SessionManager,
    turns::{AdmissionRejected, Directive, TurnManager},
};

/// Glue between the concurrent reader tasks, the tick scheduler and the
/// transport. All game state lives behind one mutex with O(1) critical
/// sections; directives are serialized and delivered before the lock is
/// released, which is what makes "broadcast of turn t precedes any input
/// finalized into t+1" hold.
pub struct GameCoordinator<S> {
    settings: SyncSettings,
    turns: Mutex<TurnManager>,
    sessions: SessionManager,
    _schema: PhantomData<S>,
}

impl<S> GameCoordinator<S>
where
    S: Schema,
    ClientMessage: Deserialize<S>,
    ServerMessage: Serialize<S>,
{
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            turns: Mutex::new(TurnManager::new(settings.clone())),
            settings,
            sessions: SessionManager::default(),
            _schema: PhantomData,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Register a freshly accepted connection and hand back its outbound
    /// queue, or refuse it because the cohort is closed.
    pub fn admit(&self, client_id: ClientId) -> Result<UnboundedReceiver<Vec<u8>>, AdmissionRejected> {
        let mut turns = self.lock_turns();
        let directives = turns.admit(&client_id)?;
        let outbound = self.sessions.connect(client_id);
        self.dispatch(directives);
        Ok(outbound)
    }

    /// One decoded-or-not message from a connection reader.
    pub fn handle_message(&self, client_id: &str, raw_message: &[u8], now_ms: u64) {
        match <ClientMessage as Deserialize<S>>::deserialize(raw_message) {
            Ok(ClientMessage::ConnectRequest) => {
                log::trace!("SERVER connect_request from {client_id}");
            }
            Ok(ClientMessage::ClientReady) => {
                let mut turns = self.lock_turns();
                let directives = turns.mark_ready(client_id, now_ms);
                self.dispatch(directives);
            }
            Ok(ClientMessage::Input { inputs }) => {
                let mut turns = self.lock_turns();
                turns.ingest_input(client_id, inputs);
            }
            Ok(ClientMessage::RequestFrames { frames }) => {
                log::debug!("SERVER {client_id} requested frames {frames:?}");
                let turns = self.lock_turns();
                let frames = turns.gap_fill(&frames);
                if !frames.is_empty() {
                    self.dispatch(vec![Directive::Send {
                        to: client_id.to_string(),
                        message: ServerMessage::FrameResponse { frames },
                    }]);
                }
            }
            Err(err) => {
                // Unknown types are skipped quietly; real decode failures
                // are louder but still keep the connection.
                match &err {
                    crate::api::error::WireError::UnknownMessage { .. } => {
                        log::debug!("SERVER ignoring message from {client_id}: {err}")
                    }
                    crate::api::error::WireError::Decode => {
                        log::warn!("SERVER dropping malformed message from {client_id}")
                    }
                }
            }
        }
    }

    pub fn handle_disconnect(&self, client_id: &str) {
        self.sessions.disconnect(client_id);
        let mut turns = self.lock_turns();
        if turns.remove_client(client_id) {
            log::info!("SERVER game reset, lobby re-armed");
        }
    }

    /// Advance logical time; called by the tick scheduler only.
    pub fn poll(&self, now_ms: u64) {
        let mut turns = self.lock_turns();
        let directives = turns.poll(now_ms);
        self.dispatch(directives);
    }

    pub fn log_state(&self) {
        let turns = self.lock_turns();
        log::debug!(
            "SERVER state: phase={:?} connected={}/{} frame={}",
            turns.phase(),
            turns.connected(),
            self.settings.required_players,
            turns.current_frame()
        );
    }

    fn lock_turns(&self) -> std::sync::MutexGuard<'_, TurnManager> {
        self.turns
            .lock()
            .expect("Should turn manager lock never be poisoned")
    }

    fn dispatch(&self, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::Send { to, message } => {
                    self.sessions.send(&to, Serialize::<S>::serialize(&message));
                }
                Directive::Broadcast { message } => {
                    self.sessions
                        .broadcast(&Serialize::<S>::serialize(&message));
                }
            }
        }
    }
}

/// The single tick scheduler: a ~100 Hz real-time poll that advances the
/// turn manager, independent of the logical tick rate. Never blocks on I/O.
pub async fn run_tick_loop<S>(
    coordinator: Arc<GameCoordinator<S>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Schema + Send + Sync + 'static,
    ClientMessage: Deserialize<S>,
    ServerMessage: Serialize<S>,
{
    let mut ticks = tokio::time::interval(Duration::from_millis(10));
    let mut last_state_dump = Instant::now();

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                coordinator.poll(clock::epoch_ms());
                if last_state_dump.elapsed() >= Duration::from_secs(5) {
                    last_state_dump = Instant::now();
                    coordinator.log_state();
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
