use std::collections::{BTreeMap, HashMap, HashSet};

use crate::api::message::ServerMessage;
use crate::config::SyncSettings;
use crate::input::{ClientId, RawInput, TurnRow};

/// Close reason handed to connections attempted outside `Lobby`.
pub const REJECT_REASON: &str = "Game already in progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Ready,
    Scheduled,
    Running,
    Aborted,
}

/// Outbound instruction for the transport layer. The turn manager itself
/// performs no I/O; the coordinator serializes and delivers these.
#[derive(Debug, PartialEq)]
pub enum Directive {
    Send {
        to: ClientId,
        message: ServerMessage,
    },
    Broadcast {
        message: ServerMessage,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub struct AdmissionRejected;

/// Owns the session state machine, the staging buffer and the turn table.
///
/// The staging buffer accumulates inputs for the currently open turn; at
/// each turn boundary it is drained atomically into a turn-table row, which
/// is immutable from then on. Broadcasts for a turn are emitted by the same
/// call that finalized it, so no later input can be attributed backwards.
pub struct TurnManager {
    settings: SyncSettings,
    phase: Phase,
    clients: Vec<ClientId>,
    ready: HashSet<ClientId>,
    staging: HashMap<ClientId, Vec<RawInput>>,
    history: BTreeMap<u64, TurnRow>,
    start_time: Option<u64>,
    current_frame: u64,
}

impl TurnManager {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            phase: Phase::Lobby,
            clients: Vec::new(),
            ready: HashSet::new(),
            staging: HashMap::new(),
            history: BTreeMap::new(),
            start_time: None,
            current_frame: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn connected(&self) -> usize {
        self.clients.len()
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Admit a freshly accepted connection. Outside `Lobby` the cohort is
    /// closed and the connection must be refused with [`REJECT_REASON`].
    pub fn admit(&mut self, client_id: &ClientId) -> Result<Vec<Directive>, AdmissionRejected> {
        if self.phase != Phase::Lobby {
            return Err(AdmissionRejected);
        }

        self.clients.push(client_id.clone());
        log::info!(
            "SERVER admitted client {client_id} ({}/{})",
            self.clients.len(),
            self.settings.required_players
        );

        let mut directives = vec![Directive::Send {
            to: client_id.clone(),
            message: ServerMessage::Welcome {
                client_id: client_id.clone(),
            },
        }];

        if self.clients.len() >= self.settings.required_players {
            self.phase = Phase::Ready;
            directives.push(Directive::Broadcast {
                message: ServerMessage::GameReady {
                    players: self.clients.len(),
                    clients: self.clients.clone(),
                },
            });
        }

        Ok(directives)
    }

    /// A client finished its local preload. Once every connected client has
    /// acknowledged, pick the anchor `T0 = now + grace` and schedule the
    /// start; turn-table row 0 is initialized to empty lists so gap fill for
    /// frame 0 answers uniformly.
    pub fn mark_ready(&mut self, client_id: &str, now_ms: u64) -> Vec<Directive> {
        if !self.clients.iter().any(|id| id == client_id) {
            log::debug!("SERVER ignoring client_ready from unknown client {client_id}");
            return Vec::new();
        }
        self.ready.insert(client_id.to_string());
        log::info!(
            "SERVER client {client_id} ready ({}/{})",
            self.ready.len(),
            self.clients.len()
        );

        let all_ready = self.clients.iter().all(|id| self.ready.contains(id));
        if self.phase != Phase::Ready || !all_ready {
            return Vec::new();
        }

        let start_time = now_ms + self.settings.grace_ms;
        self.phase = Phase::Scheduled;
        self.start_time = Some(start_time);
        self.history.insert(0, self.empty_row());
        log::info!(
            "SERVER all clients ready, starting at {start_time} (+{}ms)",
            self.settings.grace_ms
        );

        vec![Directive::Broadcast {
            message: ServerMessage::GameStart {
                start_time,
                players: self.clients.len(),
            },
        }]
    }

    /// Append an input to the currently open turn. Arrival time decides the
    /// turn; there is no backdating. Outside `Running` inputs are dropped.
    pub fn ingest_input(&mut self, client_id: &str, input: RawInput) {
        if self.phase != Phase::Running {
            log::debug!("SERVER ignoring input from {client_id} in {:?}", self.phase);
            return;
        }
        if input.is_empty() {
            return;
        }
        if !self.clients.iter().any(|id| id == client_id) {
            log::debug!("SERVER ignoring input from unknown client {client_id}");
            return;
        }
        self.staging
            .entry(client_id.to_string())
            .or_default()
            .push(input);
    }

    /// Advance logical time to the wall clock and finalize/broadcast every
    /// turn boundary crossed, in order. Called from the tick scheduler.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Directive> {
        if self.phase == Phase::Scheduled
            && let Some(start_time) = self.start_time
            && now_ms >= start_time
        {
            self.phase = Phase::Running;
            log::info!("SERVER game running at frame 0");
        }
        if self.phase != Phase::Running {
            return Vec::new();
        }

        let start_time = self
            .start_time
            .expect("Should start time always be set while running");
        let target = self.settings.frame_at(start_time, now_ms);

        let mut directives = Vec::new();
        while self.current_frame < target {
            self.current_frame += 1;
            if self.settings.is_turn_boundary(self.current_frame) {
                let turn = self.settings.turn_of(self.current_frame);
                let row = self.finalize(turn);
                directives.push(Directive::Broadcast {
                    message: ServerMessage::InputFrame {
                        current_frame: self.current_frame,
                        inputs: row,
                    },
                });
            }
        }
        directives
    }

    /// Finalized rows for the requested boundary frames, keyed by frame.
    /// Frames whose turn has not been finalized are omitted; the next
    /// regular broadcast will carry them.
    pub fn gap_fill(&self, frames: &[u64]) -> BTreeMap<u64, TurnRow> {
        let mut response = BTreeMap::new();
        for frame in frames {
            let turn = self.settings.turn_of(*frame);
            if let Some(row) = self.history.get(&turn) {
                response.insert(*frame, row.clone());
            }
        }
        response
    }

    /// Drop a disconnected client. Underflow below `required_players` in any
    /// post-lobby phase aborts the session and re-arms the lobby; clients
    /// that are still connected stay admitted for the next cohort.
    pub fn remove_client(&mut self, client_id: &str) -> bool {
        self.clients.retain(|id| id != client_id);
        self.ready.remove(client_id);
        self.staging.remove(client_id);

        if self.phase != Phase::Lobby && self.clients.len() < self.settings.required_players {
            log::warn!(
                "SERVER player underflow ({}/{}), aborting game",
                self.clients.len(),
                self.settings.required_players
            );
            self.phase = Phase::Aborted;
            self.reset();
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.phase = Phase::Lobby;
        self.ready.clear();
        self.staging.clear();
        self.history.clear();
        self.start_time = None;
        self.current_frame = 0;
    }

    fn empty_row(&self) -> TurnRow {
        self.clients
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect()
    }

    fn finalize(&mut self, turn: u64) -> TurnRow {
        assert!(
            !self.history.contains_key(&turn),
            "Should turn {turn} be finalized exactly once"
        );
        let mut row = self.empty_row();
        for (client_id, inputs) in self.staging.drain() {
            // Clients that disconnected mid-turn have no row entry.
            if let Some(slot) = row.get_mut(&client_id) {
                *slot = inputs;
            }
        }
        self.history.insert(turn, row.clone());
        row
    }
}
