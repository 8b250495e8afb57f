// Synchronization core for a deterministic-lockstep multiplayer arena game.
//
// Every client simulates the same world independently; correctness rests on
// all of them executing the identical sequence of inputs at the identical
// logical frames. The server here is a pure relay: it admits a fixed cohort
// of players, anchors a shared start time, collects inputs per turn and
// broadcasts one finalized input frame per turn boundary. The client drives
// a fixed-step executor from the wall clock and that anchor, stalling (and
// gap-filling) rather than ever stepping with wrong inputs.
//
// Layout:
//
// - `det`: seeded PRNG, collision predicates and fixed-step integration,
//   bit-identical across peers.
// - `input`: the logical input model and its merge fold.
// - `api`: the closed JSON message catalog behind a pluggable schema.
// - `server`: admission, readiness, turn finalization and broadcast.
// - `client`: the time-anchored frame executor and its transport.

pub mod api;
pub mod clock;
pub mod config;
pub mod det;
pub mod input;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;
