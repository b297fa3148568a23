//! # Target Test Harness
//!
//! Drives test firmware through an OpenOCD debug server. The firmware reserves a single
//! comm byte in RAM and polls it; the harness writes command bytes there over the TCL RPC
//! port and reads the firmware's answers from semihosting output.
//!
//! ## Connection Sequence
//!
//! 1. enable notifications and ARM semihosting, then `reset run`
//! 2. the firmware announces its comm byte (`` `comm=<hex> ``) and stops at a breakpoint
//! 3. after the settle delay the target is resumed and accepts commands
//!
//! ```ignore
//! use ocd_harness::TargetInterface;
//!
//! let mut target = TargetInterface::connect(6666).await?;
//! let ip = target.get_ip().await?;
//! target.reset().await?;
//! target.disconnect().await;
//! ```
//!
//! The [`discovery`] module describes how the serial side of a test setup is found.
pub mod discovery;
pub mod error;
mod interface;
pub mod semihost;

pub use error::HarnessError;
pub use interface::{Builder, CMD_DFU, CMD_GET_IP, Config, TargetInterface, parse_link_info};
