use std::{error::Error, fmt::Display};

use ocd_client::ClientError;

#[derive(Debug)]
pub enum HarnessError {
    Client(ClientError),
    /// The first semihosting message did not carry the comm address.
    LinkInfo(String),
    /// The firmware did not answer a command within the configured timeout.
    NoAnswer,
}

impl Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Client(error) => write!(f, "{}", error),
            HarnessError::LinkInfo(message) => {
                write!(f, "Could not parse link info from '{}'", message)
            }
            HarnessError::NoAnswer => write!(f, "The firmware did not answer"),
        }
    }
}

impl Error for HarnessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HarnessError::Client(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ClientError> for HarnessError {
    fn from(value: ClientError) -> Self {
        HarnessError::Client(value)
    }
}
