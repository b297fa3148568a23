//! # OpenOCD TCL RPC Protocol Library
//!
//! This crate implements the text protocol spoken on the TCL RPC port of an
//! [OpenOCD](https://openocd.org/) debug server, as far as it is needed to drive a target
//! under test: sending commands, receiving their replies and receiving asynchronous
//! notifications such as target state changes and semihosting messages.
//!
//! ## Overview
//!
//! The protocol is line-less: every message in either direction is UTF-8 text followed by a
//! single terminator byte ([`TERMINATOR`], `0x1A`). This library allows you to:
//!
//! - Frame outgoing commands and split the incoming byte stream into messages
//! - Tell replies from notification batches ([`Message::classify`])
//! - Parse notification lines into typed [`Event`]s ([`Event::parse`])
//!
//! ## Basic Usage
//!
//! ### Writing a Command
//!
//! ```
//! use ocd_protocol::codec::write_command;
//!
//! let mut buffer = Vec::new();
//! write_command(&mut buffer, "reset run").expect("Writing to vector shouldn't fail");
//! assert_eq!(buffer, b"reset run\x1a");
//! ```
//!
//! ### Reading Messages
//!
//! ```
//! use ocd_protocol::{Message, codec::read_message};
//! use std::io::Cursor;
//!
//! let mut reader = Cursor::new(b"type target_state state halted\r\n\x1a".to_vec());
//! let text = read_message(&mut reader).unwrap().unwrap();
//! match Message::classify(text) {
//!     Message::Events(lines) => assert_eq!(lines, ["type target_state state halted"]),
//!     Message::Reply(_) => unreachable!(),
//! }
//! ```
//!
//! ## Message Format
//!
//! - **Command**: `<text>\x1a`
//! - **Reply**: `<text>\x1a`, matched in order to the commands sent
//! - **Notification**: `type <type> [<key> <value>]...\r\n\x1a`
//!
//! Two notification types are special: `target_event` names the actual event in its `event`
//! entry, and `target_state` reports the new execution state of the target in its `state` entry.
//!
//! ## Async Support
//!
//! With the `tokio` feature enabled, [`codec::MessageCodec`] implements the `tokio-util`
//! `Decoder` and `Encoder` traits and can be used with `Framed`, `FramedRead` or `FramedWrite`.
//!
//! ## Error Handling
//!
//! Stream errors are reported as [`error::ReadError`], notification parse failures as
//! [`error::EventError`].

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod event;
pub mod firmware;
