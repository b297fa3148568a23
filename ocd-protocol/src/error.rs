use std::{error::Error, fmt::Display, io};

/// Errors that may occur when reading a message from a stream.
#[derive(Debug)]
pub enum ReadError {
    IoError(io::Error),
    /// The stream ended in the middle of a message.
    UnexpectedEof { pending: usize },
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        ReadError::IoError(value)
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::IoError(error) => write!(f, "{}", error),
            ReadError::UnexpectedEof { pending } => {
                write!(f, "Stream closed with {} unterminated bytes", pending)
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::IoError(error) => Some(error),
            ReadError::UnexpectedEof { .. } => None,
        }
    }
}

/// Reasons for discarding a notification line. Each variant carries the offending line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EventError {
    /// The line does not split into key/value pairs.
    OddTokenCount(String),
    /// No `type` key is present.
    MissingType(String),
    /// A `target_event` without the `event` key naming it.
    MissingTargetEvent(String),
}

impl Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::OddTokenCount(line) => write!(f, "malformed event: {}", line),
            EventError::MissingType(line) => {
                write!(f, "malformed event (missing type): {}", line)
            }
            EventError::MissingTargetEvent(line) => {
                write!(f, "malformed event (missing target event name): {}", line)
            }
        }
    }
}

impl Error for EventError {}
