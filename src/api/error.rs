use std::error::Error;
use std::fmt::Display;

/// Codec-level failures. Decode problems discard the offending message and
/// keep the connection; an unrecognized tag is reported separately so
/// callers can skip it without treating the peer as broken.
#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    Decode,
    UnknownMessage { type_: String },
}

impl Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode => write!(f, "malformed message payload"),
            Self::UnknownMessage { type_ } => write!(f, "unknown message type `{type_}`"),
        }
    }
}

impl Error for WireError {}
