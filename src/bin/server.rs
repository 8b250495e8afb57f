use std::env;
use std::process;

use ironstep::api::schema::json::Json;
use ironstep::config::SyncSettings;
use ironstep::server::{LockstepServer, error::ServerError, protocol::ws::WebSocketProtocol};

const DEFAULT_ADDR: &str = "127.0.0.1:8766";

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut settings = SyncSettings::default();
    if let Some(arg) = env::args().nth(1) {
        match arg.parse::<usize>() {
            Ok(count) if count > 0 => settings.required_players = count,
            _ => log::warn!(
                "invalid player count `{arg}`, using default {}",
                settings.required_players
            ),
        }
    }
    log::info!(
        "starting server on {DEFAULT_ADDR}, waiting for {} players",
        settings.required_players
    );

    let server = LockstepServer::new(
        WebSocketProtocol::new(DEFAULT_ADDR),
        Json::default(),
        settings,
    );
    match server.run().await {
        Ok(()) => process::exit(0),
        Err(err @ ServerError::BindFailure(_)) => {
            log::error!("{err}");
            process::exit(1);
        }
        Err(err) => {
            log::error!("{err}");
            process::exit(2);
        }
    }
}
