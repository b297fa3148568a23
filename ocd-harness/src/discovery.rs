//! # Device Discovery
//!
//! Test setups have two boards on serial ports: one that can reset the device under test and
//! the device itself. Which port is which is found out by asking every candidate port to
//! identify itself; a board answers with the reply marker followed by its role.
//!
//! The serial side is left to implementors of [`Discovery`] and [`DeviceLink`]. [`discover`]
//! holds the policy around them: a device whose counterpart is missing is soft reset once and
//! identification is retried after [`RETRY_DELAY`].
use std::{collections::HashMap, error::Error, fmt::Display, future::Future, io, time::Duration};

use ocd_protocol::firmware::{CMD_IDENTIFY, CMD_SOFT_RESET};

use crate::semihost::Semihost;

/// Byte sent to a board to make it identify itself.
pub const IDENTIFY_BYTE: u8 = CMD_IDENTIFY;
/// Byte that makes a board reset itself.
pub const SOFT_RESET_BYTE: u8 = CMD_SOFT_RESET;
/// Time a freshly opened port needs before it answers.
pub const SETTLE_DELAY: Duration = Duration::from_secs(4);
/// Time between the soft reset of a lone board and the second identification round.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum DeviceRole {
    Reset,
    Spark,
}

impl DeviceRole {
    pub fn name(&self) -> &'static str {
        match self {
            DeviceRole::Reset => "reset",
            DeviceRole::Spark => "spark",
        }
    }
}

impl Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The role announced in an identification reply, if any.
pub fn identify_reply(line: &str) -> Option<DeviceRole> {
    match Semihost::parse(line.trim()) {
        Semihost::Reply("reset") => Some(DeviceRole::Reset),
        Semihost::Reply("spark") => Some(DeviceRole::Spark),
        _ => None,
    }
}

/// An open connection to one board.
pub trait DeviceLink {
    /// Writes `command` and returns the line the board answers with.
    fn ask(&mut self, command: u8) -> impl Future<Output = io::Result<String>> + Send;
}

/// Finds boards among candidate ports.
pub trait Discovery {
    type Link: DeviceLink + Send;

    /// Opens every candidate, waits [`SETTLE_DELAY`], sends [`IDENTIFY_BYTE`] and returns the
    /// links that answered with a role.
    fn identify(
        &mut self,
        candidates: &[String],
    ) -> impl Future<Output = HashMap<DeviceRole, Self::Link>> + Send;
}

#[derive(Debug)]
pub enum DiscoveryError {
    NoDevices,
    /// Only one board answered, even after it was reset.
    MissingCounterpart(DeviceRole),
    Io(io::Error),
}

impl Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::NoDevices => write!(f, "No devices found"),
            DiscoveryError::MissingCounterpart(found) => {
                write!(f, "Found only the {} device", found)
            }
            DiscoveryError::Io(error) => write!(f, "I/O error: {}", error),
        }
    }
}

impl Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DiscoveryError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(value: io::Error) -> Self {
        DiscoveryError::Io(value)
    }
}

/// Both boards, by role.
pub struct Devices<L> {
    pub reset: L,
    pub spark: L,
}

fn complete<L>(mut found: HashMap<DeviceRole, L>) -> Result<Devices<L>, HashMap<DeviceRole, L>> {
    match (
        found.remove(&DeviceRole::Reset),
        found.remove(&DeviceRole::Spark),
    ) {
        (Some(reset), Some(spark)) => Ok(Devices { reset, spark }),
        (reset, spark) => {
            let mut rest = HashMap::new();
            rest.extend(reset.map(|link| (DeviceRole::Reset, link)));
            rest.extend(spark.map(|link| (DeviceRole::Spark, link)));
            Err(rest)
        }
    }
}

/// Identifies both boards among `candidates`, retrying once if only one of them answers.
pub async fn discover<D: Discovery>(
    discovery: &mut D,
    candidates: &[String],
    retry_delay: Duration,
) -> Result<Devices<D::Link>, DiscoveryError> {
    let found = match complete(discovery.identify(candidates).await) {
        Ok(devices) => return Ok(devices),
        Err(found) => found,
    };
    let Some((role, mut link)) = found.into_iter().next() else {
        return Err(DiscoveryError::NoDevices);
    };

    log::warn!("Only found the {} device, resetting it and retrying", role);
    link.ask(SOFT_RESET_BYTE).await?;
    drop(link);
    tokio::time::sleep(retry_delay).await;

    complete(discovery.identify(candidates).await).map_err(|found| {
        match found.into_keys().next() {
            Some(role) => DiscoveryError::MissingCounterpart(role),
            None => DiscoveryError::NoDevices,
        }
    })
}
