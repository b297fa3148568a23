//! # OpenOCD TCL RPC Client
//!
//! An async client for the TCL RPC port of an OpenOCD debug server, used to drive a
//! target under test from integration tests: resetting it, enabling semihosting and
//! reacting to the notifications the server sends back.
//!
//! ## Overview
//!
//! The client combines four pieces that all live on one connection task:
//!
//! - **Reply queue**: commands may be pipelined; replies are matched to commands strictly in
//!   the order the commands were sent.
//! - **Event router**: notifications are parsed and handed to every handler registered for
//!   their type. `target_event` notifications are delivered under the inner event name.
//! - **State tracker**: `target_state` notifications update the current target state and
//!   release one-shot waiters registered for that state.
//! - **Dispatcher**: tells replies from notifications and feeds the pieces above.
//!
//! For the wire format, see the [`ocd_protocol`] crate.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use ocd_client::Client;
//!
//! let client = Client::connect(6666).await?;
//!
//! client.on("halted", |_| println!("target halted"))?;
//! let replies = client
//!     .send_all(["tcl_notifications on", "reset halt"])
//!     .await?;
//! client.wait_for("halted").await?;
//!
//! let pc = client.send("reg pc")?.await?;
//! client.disconnect().await;
//! ```
//!
//! ## Timeouts
//!
//! By default a command waits for its reply forever, and since replies are matched by order,
//! a reply that never arrives also holds up every later reply. A reply timeout can be set with
//! [`Builder::reply_timeout`]; a timed out command still consumes its reply once it arrives,
//! so later commands stay correctly matched.
//!
//! ## Protocol Violations
//!
//! A reply that arrives while no command is pending means that replies can no longer be
//! matched reliably. The client logs it and fails every later [`Client::send`] with
//! [`ClientError::ProtocolDesync`]. Notifications keep being delivered.
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Commands, replies and events are logged at `debug`
//! level, malformed notifications at `warn` level.
mod client;
pub mod dispatcher;
pub mod error;
mod fan_out;
pub mod reply_queue;
pub mod router;
pub mod state;
pub mod transport;

pub use client::{Builder, Client, Config, PendingReply};
pub use error::ClientError;
pub use fan_out::fan_out;
pub use ocd_protocol::{Event, Payload};
