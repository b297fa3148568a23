use std::collections::HashMap;

use ocd_protocol::{Event, Payload, error::EventError};

use crate::fan_out::fan_out;

/// A persistent event subscription.
pub type Handler = Box<dyn Fn(&Payload) + Send>;

/// Dispatches parsed notifications to the handlers registered for their type.
///
/// Handlers are never removed once registered. Several handlers per type are allowed;
/// all of them are invoked for every matching event.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Vec<Handler>>,
}

impl EventRouter {
    pub fn new() -> EventRouter {
        EventRouter::default()
    }

    pub fn on(&mut self, kind: impl Into<String>, handler: Handler) {
        self.handlers.entry(kind.into()).or_default().push(handler);
    }

    /// Fans the payload of `event` out to the handlers of its type.
    /// Returns the number of handlers invoked.
    pub fn route(&self, event: &Event) -> usize {
        let Some(handlers) = self.handlers.get(event.kind()) else {
            log::trace!("No handlers for event {}", event.kind());
            return 0;
        };
        let payload = event.payload();
        fan_out(handlers.iter().map(|handler| move || handler(payload)))
    }

    /// Parses a notification line and routes the resulting event.
    ///
    /// Malformed lines are logged and returned as an error without invoking any handler.
    pub fn handle_line(&self, line: &str) -> Result<Event, EventError> {
        let event = Event::parse(line).inspect_err(|e| log::warn!("{}", e))?;
        log::debug!("event {}", event);
        self.route(&event);
        Ok(event)
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use ocd_protocol::{Payload, error::EventError};

    use super::EventRouter;

    fn recorder(router: &mut EventRouter, kind: &str) -> Arc<Mutex<Vec<Payload>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        router.on(
            kind,
            Box::new(move |payload| sink.lock().unwrap().push(payload.clone())),
        );
        seen
    }

    #[test]
    fn persistent_handler_fires_every_time() {
        let mut router = EventRouter::new();
        let seen = recorder(&mut router, "halted");

        router.handle_line("type target_event event halted").unwrap();
        router.handle_line("type target_event event resumed").unwrap();
        router.handle_line("type target_event event halted").unwrap();

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn target_event_is_routed_with_empty_payload() {
        let mut router = EventRouter::new();
        let seen = recorder(&mut router, "halted");
        let untouched = recorder(&mut router, "target_event");

        router.handle_line("type target_event event halted").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Payload::new()]);
        assert!(untouched.lock().unwrap().is_empty());
    }

    #[test]
    fn all_handlers_of_a_type_are_invoked() {
        let mut router = EventRouter::new();
        let first = recorder(&mut router, "target_state");
        let second = recorder(&mut router, "target_state");
        assert_eq!(router.handler_count("target_state"), 2);

        router.handle_line("type target_state state running").unwrap();

        for seen in [first, second] {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].get("state").unwrap(), "running");
        }
    }

    #[test]
    fn malformed_lines_invoke_nothing() {
        let mut router = EventRouter::new();
        let seen = recorder(&mut router, "type");

        assert!(matches!(
            router.handle_line("type"),
            Err(EventError::OddTokenCount(_))
        ));
        assert!(matches!(
            router.handle_line("state halted"),
            Err(EventError::MissingType(_))
        ));
        assert!(seen.lock().unwrap().is_empty());
    }
}
