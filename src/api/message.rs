use std::collections::BTreeMap;

use crate::input::{ClientId, RawInput, TurnRow};

/// Client-to-server catalog. The set is closed; peers ignore unlisted
/// payload fields and skip unknown types.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Optional handshake acknowledgement, a no-op on the server.
    ConnectRequest,
    /// Local preload finished; the game can be scheduled once all say so.
    ClientReady,
    /// One non-empty captured input, attributed by arrival time.
    Input { inputs: RawInput },
    /// Turn-boundary frames the client observed a gap for.
    RequestFrames { frames: Vec<u64> },
}

/// Server-to-client catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Welcome {
        client_id: ClientId,
    },
    GameReady {
        players: usize,
        clients: Vec<ClientId>,
    },
    /// Binding anchor: `start_time` is the epoch-ms instant frame 0 begins.
    GameStart {
        start_time: u64,
        players: usize,
    },
    /// One finalized turn, broadcast at its boundary frame.
    InputFrame {
        current_frame: u64,
        inputs: TurnRow,
    },
    /// Gap fill: finalized rows for previously missed boundary frames.
    FrameResponse {
        frames: BTreeMap<u64, TurnRow>,
    },
}
