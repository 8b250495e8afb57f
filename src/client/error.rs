use std::error::Error;
use std::fmt::Display;

#[derive(Debug, PartialEq, Eq)]
pub enum ClientError {
    ConnectionFailure,
    RetriesExhausted,
    NotRunning,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailure => write!(f, "failed to connect to server"),
            Self::RetriesExhausted => write!(f, "gave up connecting after exhausting retries"),
            Self::NotRunning => write!(f, "client protocol task is not running"),
        }
    }
}

impl Error for ClientError {}
