use std::collections::HashMap;
use std::fmt::Display;

/// The byte that terminates every message on the wire, in both directions (ASCII SUB).
pub const TERMINATOR: u8 = 0x1A;

/// The port the debug server listens on for TCL RPC connections.
pub const DEFAULT_PORT: u16 = 6666;

/// Ends every notification line, right before its terminator.
pub const NOTIFICATION_END: &str = "\r\n";

/// Separates individual event lines inside a single notification batch.
pub const EVENT_SEPARATOR: &str = "\r\n\x1a";

/// Every notification starts with this token.
pub const EVENT_PREFIX: &str = "type";

/// Event type that carries the actual event name in its `event` field.
pub const TARGET_EVENT: &str = "target_event";

/// Event type that reports a change of the target execution state in its `state` field.
pub const TARGET_STATE: &str = "target_state";

/// Key/value pairs of an event, without the `type` (and `event`) keys.
pub type Payload = HashMap<String, String>;

/// A single message received from the debug server, after framing.
///
/// The server never tags its messages, so the only way to tell a reply from a
/// notification is to look at the content: a notification batch starts with `type`.
/// Framing splits a batch at every terminator, so later lines of a batch arrive on their
/// own; they are recognized by the [`NOTIFICATION_END`] in front of the terminator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    /// The answer to the oldest command that has not been answered yet.
    Reply(String),
    /// One or more event lines. Lines are trimmed and never empty.
    Events(Vec<String>),
}

impl Message {
    /// Classifies a received message text as a reply or a batch of events.
    pub fn classify(text: impl Into<String>) -> Message {
        let text = text.into();
        if !text.starts_with(EVENT_PREFIX) && !text.ends_with(NOTIFICATION_END) {
            return Message::Reply(text);
        }
        let lines = text
            .split(EVENT_SEPARATOR)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Message::Events(lines)
    }
}

/// A notification sent by the debug server, e.g. a target state change or a semihosting message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    kind: String,
    payload: Payload,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: Payload) -> Event {
        Event {
            kind: kind.into(),
            payload,
        }
    }

    /// The resolved type of the event.
    /// For `target_event` notifications, this is the inner event name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The new state, if this is a `target_state` event.
    pub fn target_state(&self) -> Option<&str> {
        if self.kind == TARGET_STATE {
            self.payload.get("state").map(String::as_str)
        } else {
            None
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut entries: Vec<_> = self.payload.iter().collect();
        entries.sort();
        for (key, value) in entries {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

#[test]
fn classify_reply() {
    assert_eq!(
        Message::classify("0x20000100"),
        Message::Reply("0x20000100".to_string())
    );
    assert_eq!(Message::classify(""), Message::Reply(String::new()));
}

#[test]
fn classify_event_batch() {
    let text = "type target_state state halted\r\n\x1atype target_event event halted\r\n";
    assert_eq!(
        Message::classify(text),
        Message::Events(vec![
            "type target_state state halted".to_string(),
            "type target_event event halted".to_string(),
        ])
    );
}

#[test]
fn classify_batch_line_without_type() {
    assert_eq!(
        Message::classify("state running\r\n"),
        Message::Events(vec!["state running".to_string()])
    );
    assert_eq!(Message::classify("  \r\n"), Message::Events(vec![]));
    assert_eq!(
        Message::classify("OpenOCD 0.12"),
        Message::Reply("OpenOCD 0.12".to_string())
    );
}

#[test]
fn classify_drops_empty_lines() {
    let text = "type target_state state running\r\n\x1a  \r\n\x1a";
    assert_eq!(
        Message::classify(text),
        Message::Events(vec!["type target_state state running".to_string()])
    );
}
