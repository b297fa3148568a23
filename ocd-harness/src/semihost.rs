//! Messages the firmware prints through semihosting.
//!
//! The first character tells what a message is for: answers to test commands start with
//! [`REPLY_MARKER`], log output with [`INFO_MARKER`].
use ocd_protocol::firmware::{INFO_MARKER, REPLY_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semihost<'a> {
    /// Answer to a test command, marker removed.
    Reply(&'a str),
    /// Firmware log output, marker removed.
    Info(&'a str),
    Untagged(&'a str),
}

impl<'a> Semihost<'a> {
    pub fn parse(message: &'a str) -> Semihost<'a> {
        if let Some(reply) = message.strip_prefix(REPLY_MARKER) {
            Semihost::Reply(reply)
        } else if let Some(info) = message.strip_prefix(INFO_MARKER) {
            Semihost::Info(info)
        } else {
            Semihost::Untagged(message)
        }
    }
}
