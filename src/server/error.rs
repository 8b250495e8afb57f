use std::error::Error;
use std::fmt::Display;

#[derive(Debug)]
pub enum ServerError {
    BindFailure(std::io::Error),
    Internal(String),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindFailure(err) => write!(f, "failed to bind listener: {err}"),
            Self::Internal(reason) => write!(f, "internal server error: {reason}"),
        }
    }
}

impl Error for ServerError {}
