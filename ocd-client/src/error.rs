use std::{error::Error, fmt::Display, io};

/// Errors reported to users of the [`Client`](crate::Client).
#[derive(Debug)]
pub enum ClientError {
    /// The single connection attempt failed.
    Connect(io::Error),
    /// The connection is closed, either by [`Client::disconnect`](crate::Client::disconnect)
    /// or because the server went away or a write failed.
    Disconnected,
    /// No reply arrived within the configured reply timeout.
    ReplyTimeout,
    /// A reply arrived while no command was waiting for one.
    /// Replies can no longer be matched to commands reliably.
    ProtocolDesync,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Connect(error) => write!(f, "Could not connect to debug server: {}", error),
            ClientError::Disconnected => write!(f, "Connection to debug server closed"),
            ClientError::ReplyTimeout => write!(f, "Timed out while waiting for a reply"),
            ClientError::ProtocolDesync => {
                write!(f, "Received a reply without a pending command")
            }
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Connect(error) => Some(error),
            _ => None,
        }
    }
}

/// Protocol violations detected while dispatching an incoming message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DispatchError {
    /// A reply arrived with an empty reply queue. Carries the reply text.
    UnmatchedReply(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnmatchedReply(reply) => {
                write!(f, "Reply '{}' does not belong to any command", reply)
            }
        }
    }
}

impl Error for DispatchError {}
