use std::env;
use std::process;
use std::time::Duration;

use ironstep::api::message::{ClientMessage, ServerMessage};
use ironstep::api::schema::json::Json;
use ironstep::client::executor::{FrameExecutor, Simulation};
use ironstep::client::protocol::{GameEvent, ws::WebSocketClientProtocol};
use ironstep::client::LockstepClient;
use ironstep::clock;
use ironstep::config::SyncSettings;
use ironstep::det::digest::StateDigest;
use ironstep::input::TurnInputs;

const DEFAULT_URL: &str = "ws://127.0.0.1:8766";

/// Headless reference world: no rendering, just a running digest of every
/// applied input so divergence shows up in the logs.
#[derive(Default)]
struct DigestWorld {
    frame: u64,
    digest: StateDigest,
}

impl Simulation for DigestWorld {
    fn step(&mut self, inputs: &TurnInputs) {
        let mut applied: Vec<_> = inputs.iter().collect();
        applied.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (client_id, input) in applied {
            self.digest.write_str(client_id);
            self.digest.write_u64(input.movement as u64);
            self.digest.write_u64(input.shoot as u64);
            log::debug!("frame {}: {client_id} -> {input:?}", self.frame);
        }
        self.frame += 1;
        if self.frame % 300 == 0 {
            log::info!("frame {}: digest {:016x}", self.frame, self.digest.value());
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let settings = SyncSettings::default();

    let client =
        match LockstepClient::<Json>::connect(WebSocketClientProtocol::new(&url), &settings).await {
            Ok(client) => client,
            Err(err) => {
                log::error!("{err}");
                process::exit(1);
            }
        };
    log::info!("connected to {url}");

    let mut executor = FrameExecutor::new(settings);
    let mut world = DigestWorld::default();
    let mut updates = tokio::time::interval(Duration::from_millis(16));

    loop {
        tokio::select! {
            event = client.next_event() => {
                match event {
                    Some(GameEvent::Message(message)) => {
                        if matches!(message, ServerMessage::GameReady { .. })
                            && client.send(&ClientMessage::ClientReady).is_err()
                        {
                            break;
                        }
                        executor.apply_message(&message);
                    }
                    Some(GameEvent::Disconnected) | None => {
                        log::info!("server connection closed");
                        break;
                    }
                }
            }
            _ = updates.tick() => {
                for message in executor.advance(clock::epoch_ms(), &mut world) {
                    if client.send(&message).is_err() {
                        break;
                    }
                }
            }
        }
    }

    process::exit(0);
}
