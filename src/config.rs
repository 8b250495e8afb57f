/// Deployment constants shared by server and clients. Every peer in a
/// session must be built with identical values; changing any of them is a
/// protocol break.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Logical simulation rate in frames per second.
    pub tick_hz: u32,
    /// Number of frames per turn. Inputs apply at the first frame of a turn.
    pub turn_size: u64,
    /// Delay between scheduling a start and frame 0, in milliseconds.
    pub grace_ms: u64,
    /// Connected clients needed before a game can begin.
    pub required_players: usize,
    /// Maximum frames advanced per real-time update while catching up.
    pub catchup_cap: u32,
    /// Connection attempts before the client gives up.
    pub max_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            turn_size: 5,
            grace_ms: 500,
            required_players: 1,
            catchup_cap: 10,
            max_retries: 10,
        }
    }
}

impl SyncSettings {
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.tick_hz as f64
    }

    /// Fixed integration step in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.tick_hz as f64
    }

    pub fn turn_of(&self, frame: u64) -> u64 {
        frame / self.turn_size
    }

    pub fn is_turn_boundary(&self, frame: u64) -> bool {
        frame % self.turn_size == 0
    }

    /// Frame the wall clock says we should be at, given the anchor time.
    pub fn frame_at(&self, start_time_ms: u64, now_ms: u64) -> u64 {
        if now_ms < start_time_ms {
            return 0;
        }
        (now_ms - start_time_ms) * self.tick_hz as u64 / 1000
    }
}
