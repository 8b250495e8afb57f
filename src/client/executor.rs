use std::collections::BTreeMap;

use crate::api::message::{ClientMessage, ServerMessage};
use crate::config::SyncSettings;
use crate::input::{ClientId, TurnInputs, TurnRow};

/// The simulation this executor drives. `step` must be a pure function of
/// its arguments and prior state: deterministic arithmetic only, no clocks,
/// no unseeded randomness.
pub trait Simulation {
    fn step(&mut self, inputs: &TurnInputs);
}

/// Re-request backoff for still-missing frames.
const REQUEST_INTERVAL_MS: u64 = 1000;

/// Time-anchored fixed-step driver. Real time is folded into an
/// accumulator; each whole frame interval advances the simulation exactly
/// one frame, applying merged inputs at turn boundaries and the empty input
/// everywhere else. A missing boundary row stops advancement (and asks the
/// server for the gap) instead of ever stepping with wrong inputs.
pub struct FrameExecutor {
    settings: SyncSettings,
    client_id: Option<ClientId>,
    start_time: Option<u64>,
    current_frame: u64,
    accumulator_ms: f64,
    last_update_ms: Option<u64>,
    input_buffer: BTreeMap<u64, TurnRow>,
    logical_inputs: TurnInputs,
    latest_received_frame: Option<u64>,
    missing_frames: Vec<u64>,
    waiting_for_input: bool,
    last_request_ms: Option<u64>,
}

impl FrameExecutor {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            client_id: None,
            start_time: None,
            current_frame: 0,
            accumulator_ms: 0.0,
            last_update_ms: None,
            input_buffer: BTreeMap::new(),
            logical_inputs: TurnInputs::new(),
            latest_received_frame: None,
            missing_frames: Vec::new(),
            waiting_for_input: false,
            last_request_ms: None,
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.waiting_for_input
    }

    pub fn logical_inputs(&self) -> &TurnInputs {
        &self.logical_inputs
    }

    /// Feed one decoded server message into the executor state.
    pub fn apply_message(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Welcome { client_id } => {
                log::info!("CLIENT assigned id {client_id}");
                self.client_id = Some(client_id.clone());
            }
            ServerMessage::GameReady { players, clients } => {
                log::info!("CLIENT game ready with {players} players: {clients:?}");
            }
            ServerMessage::GameStart {
                start_time,
                players,
            } => {
                if let Some(previous) = self.start_time {
                    if previous != *start_time {
                        log::warn!(
                            "CLIENT ignoring conflicting game_start {start_time} (anchored at {previous})"
                        );
                    }
                    return;
                }
                log::info!("CLIENT game of {players} starts at {start_time}");
                self.start_time = Some(*start_time);
                self.last_update_ms = Some(*start_time);
            }
            ServerMessage::InputFrame {
                current_frame,
                inputs,
            } => {
                self.store_row(*current_frame, inputs);
            }
            ServerMessage::FrameResponse { frames } => {
                for (frame, row) in frames {
                    self.store_row(*frame, row);
                }
            }
        }
    }

    /// Idempotent insert: a row already installed for a frame is never
    /// replaced, so duplicate gap-fill deliveries cannot change history.
    fn store_row(&mut self, frame: u64, row: &TurnRow) {
        self.input_buffer.entry(frame).or_insert_with(|| row.clone());
        self.latest_received_frame = Some(match self.latest_received_frame {
            Some(latest) => latest.max(frame),
            None => frame,
        });
        self.missing_frames.retain(|missing| *missing != frame);
    }

    /// One real-time update tick: fold elapsed wall time into the
    /// accumulator and advance whole frames, up to the catch-up cap.
    /// Returns protocol messages the caller must send (gap-fill requests).
    pub fn advance<W: Simulation>(&mut self, now_ms: u64, world: &mut W) -> Vec<ClientMessage> {
        let mut outbound = Vec::new();

        let Some(start_time) = self.start_time else {
            return outbound;
        };
        if now_ms < start_time {
            return outbound;
        }

        let last_update = self.last_update_ms.unwrap_or(start_time);
        self.accumulator_ms += now_ms.saturating_sub(last_update) as f64;
        self.last_update_ms = Some(now_ms);

        let mut consecutive_advances = 0;
        while self.accumulator_ms >= self.settings.frame_interval_ms() {
            if !self.advance_one_frame(now_ms, world, &mut outbound) {
                break;
            }
            self.accumulator_ms -= self.settings.frame_interval_ms();
            consecutive_advances += 1;
            if consecutive_advances >= self.settings.catchup_cap {
                break;
            }
        }

        outbound
    }

    /// Frame 0 is the very first tick and has no pre-turn of captured
    /// input, so it runs as a non-input frame; every later turn boundary
    /// requires its row before the simulation may step.
    fn advance_one_frame<W: Simulation>(
        &mut self,
        now_ms: u64,
        world: &mut W,
        outbound: &mut Vec<ClientMessage>,
    ) -> bool {
        let frame = self.current_frame;

        if frame != 0 && self.settings.is_turn_boundary(frame) {
            if let Some(row) = self.input_buffer.get(&frame) {
                self.logical_inputs.install(row);
                self.waiting_for_input = false;
            } else {
                self.waiting_for_input = true;
                self.request_missing(frame, now_ms, outbound);
                return false;
            }
        } else {
            self.logical_inputs.clear();
        }

        world.step(&self.logical_inputs);
        self.current_frame = frame + 1;
        true
    }

    fn request_missing(&mut self, frame: u64, now_ms: u64, outbound: &mut Vec<ClientMessage>) {
        let Some(latest) = self.latest_received_frame else {
            return;
        };
        if latest <= frame {
            // Nothing newer has arrived: the row is simply late and the
            // next regular broadcast will carry it.
            return;
        }

        self.missing_frames = (frame..=latest)
            .step_by(self.settings.turn_size as usize)
            .filter(|boundary| !self.input_buffer.contains_key(boundary))
            .collect();
        if self.missing_frames.is_empty() {
            return;
        }

        let due = self
            .last_request_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= REQUEST_INTERVAL_MS);
        if due {
            log::debug!("CLIENT requesting missing frames {:?}", self.missing_frames);
            self.last_request_ms = Some(now_ms);
            outbound.push(ClientMessage::RequestFrames {
                frames: self.missing_frames.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Movement, RawInput};

    /// Records every step the executor takes: (frame, inputs snapshot).
    #[derive(Default)]
    struct Recorder {
        steps: Vec<(u64, Vec<(ClientId, RawInput)>)>,
        frame: u64,
    }

    impl Simulation for Recorder {
        fn step(&mut self, inputs: &TurnInputs) {
            let mut snapshot: Vec<_> = inputs
                .iter()
                .map(|(id, input)| (id.clone(), *input))
                .collect();
            snapshot.sort_by(|(a, _), (b, _)| a.cmp(b));
            self.steps.push((self.frame, snapshot));
            self.frame += 1;
        }
    }

    const T0: u64 = 10_000;

    fn settings() -> SyncSettings {
        SyncSettings::default()
    }

    fn row(entries: &[(&str, Vec<RawInput>)]) -> TurnRow {
        entries
            .iter()
            .map(|(id, inputs)| (id.to_string(), inputs.clone()))
            .collect()
    }

    fn started_executor() -> FrameExecutor {
        let mut executor = FrameExecutor::new(settings());
        executor.apply_message(&ServerMessage::Welcome {
            client_id: "me".to_string(),
        });
        executor.apply_message(&ServerMessage::GameStart {
            start_time: T0,
            players: 1,
        });
        executor
    }

    fn frame_message(frame: u64, inputs: TurnRow) -> ServerMessage {
        ServerMessage::InputFrame {
            current_frame: frame,
            inputs,
        }
    }

    #[test]
    fn does_not_advance_before_the_anchor() {
        let mut executor = started_executor();
        let mut world = Recorder::default();
        assert!(executor.advance(T0 - 1, &mut world).is_empty());
        assert_eq!(executor.current_frame(), 0);
        assert!(world.steps.is_empty());
    }

    #[test]
    fn advances_frames_as_a_pure_function_of_elapsed_time() {
        let mut executor = started_executor();
        executor.apply_message(&frame_message(5, row(&[("me", vec![])])));
        let mut world = Recorder::default();

        // 167 ms after T0 at 30 Hz is five whole frame intervals: frames
        // 0..=4 run and the executor sits at the boundary.
        executor.advance(T0 + 167, &mut world);
        assert_eq!(executor.current_frame(), 5);
        assert!(!executor.is_waiting_for_input());
        assert_eq!(world.steps.len(), 5);
    }

    #[test]
    fn frame_zero_is_not_an_input_frame() {
        let mut executor = started_executor();
        let mut world = Recorder::default();
        // No row for frame 0 exists anywhere, yet the first frame runs.
        executor.advance(T0 + 34, &mut world);
        assert_eq!(executor.current_frame(), 1);
        assert_eq!(world.steps[0].1, vec![]);
    }

    #[test]
    fn stalls_at_a_boundary_without_its_row() {
        let mut executor = started_executor();
        let mut world = Recorder::default();

        let outbound = executor.advance(T0 + 400, &mut world);
        // Frames 0..=4 ran, frame 5 is blocked; nothing newer was received
        // so no request goes out.
        assert_eq!(executor.current_frame(), 5);
        assert!(executor.is_waiting_for_input());
        assert!(outbound.is_empty());

        // The row arrives: execution resumes exactly where it stopped and
        // runs up to the next unknown boundary.
        executor.apply_message(&frame_message(5, row(&[("me", vec![])])));
        executor.advance(T0 + 401, &mut world);
        assert_eq!(executor.current_frame(), 10);
        assert!(executor.is_waiting_for_input());
    }

    #[test]
    fn boundary_installs_merged_inputs_and_non_input_frames_clear_them() {
        let mut executor = started_executor();
        executor.apply_message(&frame_message(
            5,
            row(&[
                (
                    "a",
                    vec![
                        RawInput::new(Movement::Right, false),
                        RawInput::new(Movement::Up, false),
                        RawInput::new(Movement::Stop, true),
                    ],
                ),
                ("b", vec![]),
            ]),
        ));
        let mut world = Recorder::default();
        executor.advance(T0 + 240, &mut world);

        // Frame 5 saw the merged inputs.
        let (frame, inputs) = &world.steps[5];
        assert_eq!(*frame, 5);
        assert_eq!(
            *inputs,
            vec![
                ("a".to_string(), RawInput::new(Movement::Up, true)),
                ("b".to_string(), RawInput::EMPTY),
            ]
        );
        // Frame 6 is a non-input frame: the table is cleared again.
        assert_eq!(world.steps[6].1, vec![]);
    }

    #[test]
    fn detects_gaps_and_requests_only_missing_boundaries() {
        let mut executor = started_executor();
        executor.apply_message(&frame_message(5, row(&[("me", vec![])])));
        // 10 never arrives; 15 does.
        executor.apply_message(&frame_message(15, row(&[("me", vec![])])));
        let mut world = Recorder::default();

        // First update is capped at ten frames; the follow-up hits the
        // boundary at 10 and finds the gap.
        assert!(executor.advance(T0 + 400, &mut world).is_empty());
        assert_eq!(executor.current_frame(), 10);
        let outbound = executor.advance(T0 + 401, &mut world);
        assert!(executor.is_waiting_for_input());
        assert_eq!(
            outbound,
            vec![ClientMessage::RequestFrames { frames: vec![10] }]
        );
    }

    #[test]
    fn rerequests_are_rate_limited() {
        let mut executor = started_executor();
        executor.apply_message(&frame_message(15, row(&[("me", vec![])])));
        let mut world = Recorder::default();

        let first = executor.advance(T0 + 600, &mut world);
        assert_eq!(first.len(), 1);
        // 200 ms later: still missing, but no duplicate request yet.
        let second = executor.advance(T0 + 800, &mut world);
        assert!(second.is_empty());
        // Past the 1 s window the request repeats.
        let third = executor.advance(T0 + 1_700, &mut world);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn gap_fill_resumes_execution_and_is_idempotent() {
        let mut executor = started_executor();
        executor.apply_message(&frame_message(5, row(&[("me", vec![])])));
        executor.apply_message(&frame_message(
            15,
            row(&[("me", vec![RawInput::new(Movement::Left, false)])]),
        ));
        let mut world = Recorder::default();
        executor.advance(T0 + 600, &mut world);
        assert_eq!(executor.current_frame(), 10);

        let fill = ServerMessage::FrameResponse {
            frames: [(10u64, row(&[("me", vec![RawInput::new(Movement::Down, true)])]))]
                .into_iter()
                .collect(),
        };
        executor.apply_message(&fill);

        // A duplicate delivery of an already-present frame changes nothing.
        let conflicting = ServerMessage::FrameResponse {
            frames: [(15u64, row(&[("me", vec![])]))].into_iter().collect(),
        };
        executor.apply_message(&conflicting);

        executor.advance(T0 + 601, &mut world);
        assert!(executor.current_frame() >= 15);
        // Frame 15 still carries its original row, not the duplicate's.
        let (_, inputs) = world
            .steps
            .iter()
            .find(|(frame, _)| *frame == 15)
            .expect("frame 15 stepped");
        assert_eq!(
            *inputs,
            vec![("me".to_string(), RawInput::new(Movement::Left, false))]
        );
    }

    #[test]
    fn catchup_is_capped_per_update() {
        let mut executor = started_executor();
        for boundary in (5..=300).step_by(5) {
            executor.apply_message(&frame_message(boundary, row(&[("me", vec![])])));
        }
        let mut world = Recorder::default();

        // Ten seconds behind: a single update may only advance catchup_cap
        // frames.
        executor.advance(T0 + 10_000, &mut world);
        assert_eq!(executor.current_frame(), 10);
        executor.advance(T0 + 10_001, &mut world);
        assert_eq!(executor.current_frame(), 20);
    }

    #[test]
    fn current_frame_is_monotone() {
        let mut executor = started_executor();
        for boundary in (5..=60).step_by(5) {
            executor.apply_message(&frame_message(boundary, row(&[("me", vec![])])));
        }
        let mut world = Recorder::default();

        let mut previous = 0;
        // Deliberately jittered, sometimes repeated, observation times.
        for now in [0u64, 34, 34, 100, 90, 300, 600, 600, 2_000] {
            executor.advance(T0 + now, &mut world);
            assert!(executor.current_frame() >= previous);
            previous = executor.current_frame();
        }
    }

    #[test]
    fn identical_event_sequences_execute_identically() {
        let events = vec![
            frame_message(
                5,
                row(&[("a", vec![RawInput::new(Movement::Right, true)]), ("b", vec![])]),
            ),
            frame_message(10, row(&[("a", vec![]), ("b", vec![RawInput::new(Movement::Up, false)])])),
            frame_message(15, row(&[("a", vec![]), ("b", vec![])])),
        ];

        let run = || {
            let mut executor = started_executor();
            for event in &events {
                executor.apply_message(event);
            }
            let mut world = Recorder::default();
            for now in [50u64, 167, 200, 400, 467, 600] {
                executor.advance(T0 + now, &mut world);
            }
            (executor.current_frame(), world.steps)
        };

        let (frames_a, steps_a) = run();
        let (frames_b, steps_b) = run();
        assert_eq!(frames_a, frames_b);
        assert_eq!(steps_a, steps_b);
    }
}
