//! Conventions of the semihosting test firmware, shared by the harness and the simulator.
//!
//! The firmware takes single command bytes and prints its answers as semihosting messages.
//! Answers to commands start with [`REPLY_MARKER`], log output with [`INFO_MARKER`].

pub const REPLY_MARKER: char = '`';
pub const INFO_MARKER: char = '~';

/// Asks a board for its role.
pub const CMD_IDENTIFY: u8 = b'?';
pub const CMD_GET_IP: u8 = b'a';
pub const CMD_DFU: u8 = b'b';
/// Makes a board reset itself.
pub const CMD_SOFT_RESET: u8 = b'r';
