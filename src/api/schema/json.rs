use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::api::{
    error::WireError,
    message::{ClientMessage, ServerMessage},
    schema::{Deserialize, Schema, SchemaType, Serialize},
};
use crate::input::TurnRow;

#[derive(Default)]
pub struct Json {}

impl Schema for Json {
    fn schema_type() -> SchemaType {
        SchemaType::Text
    }
}

const TYPE: &str = "type";

const WELCOME: &str = "welcome";
const CONNECT_REQUEST: &str = "connect_request";
const GAME_READY: &str = "game_ready";
const CLIENT_READY: &str = "client_ready";
const GAME_START: &str = "game_start";
const INPUT: &str = "input";
const INPUT_FRAME: &str = "input_frame";
const REQUEST_FRAMES: &str = "request_frames";
const FRAME_RESPONSE: &str = "frame_response";

const CLIENT_ID: &str = "client_id";
const PLAYERS: &str = "players";
const CLIENTS: &str = "clients";
const START_TIME: &str = "start_time";
const CURRENT_FRAME: &str = "current_frame";
const INPUTS: &str = "inputs";
const FRAMES: &str = "frames";

fn row_to_value(row: &TurnRow) -> Value {
    serde_json::to_value(row).expect("Should turn rows always serialize")
}

fn row_from_value(value: &Value) -> Result<TurnRow, WireError> {
    serde_json::from_value(value.clone()).map_err(|_| WireError::Decode)
}

fn tag_of(json: &Value) -> Result<&str, WireError> {
    json.get(TYPE)
        .and_then(Value::as_str)
        .ok_or(WireError::Decode)
}

impl Serialize<Json> for ClientMessage {
    fn serialize(&self) -> Vec<u8> {
        match self {
            ClientMessage::ConnectRequest => serde_json::json!({ TYPE: CONNECT_REQUEST }),
            ClientMessage::ClientReady => serde_json::json!({ TYPE: CLIENT_READY }),
            ClientMessage::Input { inputs } => serde_json::json!({
                TYPE: INPUT,
                INPUTS: serde_json::to_value(inputs).expect("Should inputs always serialize")
            }),
            ClientMessage::RequestFrames { frames } => serde_json::json!({
                TYPE: REQUEST_FRAMES,
                FRAMES: frames
            }),
        }
        .to_string()
        .into_bytes()
    }
}

impl Deserialize<Json> for ClientMessage {
    fn deserialize(buf: &[u8]) -> Result<Self, WireError> {
        let json: Value = serde_json::from_slice(buf).map_err(|_| WireError::Decode)?;

        match tag_of(&json)? {
            CONNECT_REQUEST => Ok(ClientMessage::ConnectRequest),
            CLIENT_READY => Ok(ClientMessage::ClientReady),
            INPUT => {
                let inputs = json.get(INPUTS).ok_or(WireError::Decode)?;
                Ok(ClientMessage::Input {
                    inputs: serde_json::from_value(inputs.clone()).map_err(|_| WireError::Decode)?,
                })
            }
            REQUEST_FRAMES => {
                let frames = json
                    .get(FRAMES)
                    .and_then(Value::as_array)
                    .ok_or(WireError::Decode)?
                    .iter()
                    .map(|frame| frame.as_u64().ok_or(WireError::Decode))
                    .collect::<Result<Vec<u64>, _>>()?;
                Ok(ClientMessage::RequestFrames { frames })
            }
            other => Err(WireError::UnknownMessage {
                type_: other.to_string(),
            }),
        }
    }
}

impl Serialize<Json> for ServerMessage {
    fn serialize(&self) -> Vec<u8> {
        match self {
            ServerMessage::Welcome { client_id } => serde_json::json!({
                TYPE: WELCOME,
                CLIENT_ID: client_id
            }),
            ServerMessage::GameReady { players, clients } => serde_json::json!({
                TYPE: GAME_READY,
                PLAYERS: players,
                CLIENTS: clients
            }),
            ServerMessage::GameStart {
                start_time,
                players,
            } => serde_json::json!({
                TYPE: GAME_START,
                START_TIME: start_time,
                PLAYERS: players
            }),
            ServerMessage::InputFrame {
                current_frame,
                inputs,
            } => serde_json::json!({
                TYPE: INPUT_FRAME,
                CURRENT_FRAME: current_frame,
                INPUTS: row_to_value(inputs)
            }),
            ServerMessage::FrameResponse { frames } => {
                let mut by_frame = Map::with_capacity(frames.len());
                for (frame, row) in frames {
                    by_frame.insert(frame.to_string(), row_to_value(row));
                }
                serde_json::json!({
                    TYPE: FRAME_RESPONSE,
                    FRAMES: Value::Object(by_frame)
                })
            }
        }
        .to_string()
        .into_bytes()
    }
}

impl Deserialize<Json> for ServerMessage {
    fn deserialize(buf: &[u8]) -> Result<Self, WireError> {
        let json: Value = serde_json::from_slice(buf).map_err(|_| WireError::Decode)?;

        match tag_of(&json)? {
            WELCOME => {
                let client_id = json
                    .get(CLIENT_ID)
                    .and_then(Value::as_str)
                    .ok_or(WireError::Decode)?;
                Ok(ServerMessage::Welcome {
                    client_id: client_id.to_string(),
                })
            }
            GAME_READY => {
                let players = json
                    .get(PLAYERS)
                    .and_then(Value::as_u64)
                    .ok_or(WireError::Decode)? as usize;
                let clients = json
                    .get(CLIENTS)
                    .and_then(Value::as_array)
                    .ok_or(WireError::Decode)?
                    .iter()
                    .map(|id| {
                        id.as_str()
                            .map(str::to_string)
                            .ok_or(WireError::Decode)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ServerMessage::GameReady { players, clients })
            }
            GAME_START => {
                let start_time = json
                    .get(START_TIME)
                    .and_then(Value::as_u64)
                    .ok_or(WireError::Decode)?;
                let players = json
                    .get(PLAYERS)
                    .and_then(Value::as_u64)
                    .ok_or(WireError::Decode)? as usize;
                Ok(ServerMessage::GameStart {
                    start_time,
                    players,
                })
            }
            INPUT_FRAME => {
                let current_frame = json
                    .get(CURRENT_FRAME)
                    .and_then(Value::as_u64)
                    .ok_or(WireError::Decode)?;
                let inputs = row_from_value(json.get(INPUTS).ok_or(WireError::Decode)?)?;
                Ok(ServerMessage::InputFrame {
                    current_frame,
                    inputs,
                })
            }
            FRAME_RESPONSE => {
                let entries = json
                    .get(FRAMES)
                    .and_then(Value::as_object)
                    .ok_or(WireError::Decode)?;
                let mut frames = BTreeMap::new();
                for (frame, row) in entries {
                    let frame = frame.parse::<u64>().map_err(|_| WireError::Decode)?;
                    frames.insert(frame, row_from_value(row)?);
                }
                Ok(ServerMessage::FrameResponse { frames })
            }
            other => Err(WireError::UnknownMessage {
                type_: other.to_string(),
            }),
        }
    }
}
