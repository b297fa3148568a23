//! # OpenOCD TCL RPC Server Stand-in
//!
//! This crate answers the TCL RPC protocol of an OpenOCD debug server without any hardware
//! attached. It exists to test clients and harnesses built on [`ocd_client`](../ocd_client/index.html)
//! and is not a general implementation of the debug server.
//!
//! ## Architecture
//!
//! - **[`DebugServer`] Trait**: turns a command into a [`Response`], i.e. the reply text and the
//!   notifications the command causes
//! - **[`server::Server`]**: a generic server that handles connections, framing and the order in
//!   which notifications and replies are written
//! - **[`simulator::TargetSimulator`]**: a backend that mimics a target running firmware with a
//!   semihosting test interface
//!
//! ## Basic Usage
//!
//! ```ignore
//! use ocd_server::{server::Server, simulator::TargetSimulator};
//!
//! let mut server = Server::new(TargetSimulator::default(), Default::default());
//! server.listen("127.0.0.1:6666")?;
//! ```
//!
//! ## Thread Model
//!
//! Connections are served one after the other on the calling thread, matching the
//! single-client model of the protocol.
use ocd_protocol::Event;

pub mod server;
pub mod simulator;

/// What the server sends back for a single command.
///
/// The events are written as notifications before the reply.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    pub events: Vec<Event>,
    pub reply: String,
}

impl Response {
    pub fn reply(reply: impl Into<String>) -> Response {
        Response {
            events: Vec::new(),
            reply: reply.into(),
        }
    }

    pub fn with_event(mut self, event: Event) -> Response {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Response {
        self.events.extend(events);
        self
    }
}

/// Trait that backends implement to answer commands.
pub trait DebugServer {
    /// Executes `command` and returns its reply together with the notifications it caused.
    ///
    /// The protocol has no error channel; failures are reported in the reply text.
    fn execute(&mut self, command: &str) -> Response;
}
