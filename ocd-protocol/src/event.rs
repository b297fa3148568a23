//! Parsing of notification lines into [`Event`]s
use crate::error::EventError;
use crate::protocol::{EVENT_PREFIX, Event, Payload, TARGET_EVENT};

const TARGET_EVENT_KEY: &str = "event";

impl Event {
    /// Parses a single notification line of alternating, whitespace separated keys and values.
    ///
    /// The `type` entry is removed from the payload and becomes the kind of the event.
    /// A `target_event` is resolved to the name in its `event` entry, which is removed as well.
    ///
    /// ```
    /// use ocd_protocol::Event;
    ///
    /// let event = Event::parse("type target_event event halted").unwrap();
    /// assert_eq!(event.kind(), "halted");
    /// assert!(event.payload().is_empty());
    /// ```
    pub fn parse(line: &str) -> Result<Event, EventError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(EventError::OddTokenCount(line.to_string()));
        }

        let mut payload: Payload = tokens
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        let mut kind = payload
            .remove(EVENT_PREFIX)
            .ok_or_else(|| EventError::MissingType(line.to_string()))?;

        if kind == TARGET_EVENT {
            kind = payload
                .remove(TARGET_EVENT_KEY)
                .ok_or_else(|| EventError::MissingTargetEvent(line.to_string()))?;
        }

        Ok(Event::new(kind, payload))
    }

    /// Renders the event the way the debug server sends it, without the trailing separator.
    /// Payload entries are written in key order.
    pub fn to_line(&self) -> String {
        let mut line = format!("{} {}", EVENT_PREFIX, self.kind());
        let mut entries: Vec<_> = self.payload().iter().collect();
        entries.sort();
        for (key, value) in entries {
            line.push(' ');
            line.push_str(key);
            line.push(' ');
            line.push_str(value);
        }
        line
    }
}
