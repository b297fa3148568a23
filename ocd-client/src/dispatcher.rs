use ocd_protocol::Message;

use crate::{error::DispatchError, reply_queue::ReplyQueue, router::EventRouter, state::StateTracker};

/// Routes every incoming message either to the reply queue or, line by line, to the event router.
/// `target_state` events additionally update the state tracker, after their handlers ran.
#[derive(Default)]
pub struct Dispatcher {
    pub replies: ReplyQueue,
    pub router: EventRouter,
    pub state: StateTracker,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    pub fn dispatch(&mut self, text: String) -> Result<(), DispatchError> {
        match Message::classify(text) {
            Message::Reply(reply) => {
                log::debug!("reply {:?}", reply);
                self.replies.complete(reply)
            }
            Message::Events(lines) => {
                for line in lines {
                    // Malformed lines are logged by the router and skipped.
                    let Ok(event) = self.router.handle_line(&line) else {
                        continue;
                    };
                    if let Some(state) = event.target_state() {
                        self.state.update(state);
                    }
                }
                Ok(())
            }
        }
    }

    /// Drops all pending replies, handlers and waiters.
    pub fn clear(&mut self) {
        self.replies.clear();
        self.router.clear();
        self.state.clear();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::sync::oneshot;

    use super::Dispatcher;
    use crate::error::DispatchError;

    #[test]
    fn replies_interleaved_with_events_keep_order() {
        let mut dispatcher = Dispatcher::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = oneshot::channel();
            dispatcher.replies.enqueue(tx);
            receivers.push(rx);
        }

        dispatcher.dispatch("a".to_string()).unwrap();
        dispatcher
            .dispatch("type target_state state halted\r\n".to_string())
            .unwrap();
        dispatcher.dispatch("b".to_string()).unwrap();
        dispatcher
            .dispatch("type target_event event halted\r\n".to_string())
            .unwrap();
        dispatcher.dispatch("c".to_string()).unwrap();

        let replies: Vec<_> = receivers
            .into_iter()
            .map(|mut rx| rx.try_recv().unwrap())
            .collect();
        assert_eq!(replies, ["a", "b", "c"]);
    }

    #[test]
    fn target_state_updates_tracker_and_fires_waiter() {
        let mut dispatcher = Dispatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        dispatcher.state.when(
            "running",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher
            .dispatch("type target_state state running".to_string())
            .unwrap();

        assert_eq!(dispatcher.state.current(), Some("running"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_event_reaches_handlers_and_tracker() {
        let mut dispatcher = Dispatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        dispatcher.router.on(
            "target_state",
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        dispatcher
            .dispatch("type target_state state reset".to_string())
            .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.state.current(), Some("reset"));
    }

    #[test]
    fn batch_lines_are_dispatched_in_order() {
        let mut dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in ["reset-start", "halted"] {
            let sink = seen.clone();
            dispatcher.router.on(
                kind,
                Box::new(move |_| sink.lock().unwrap().push(kind)),
            );
        }

        dispatcher
            .dispatch(
                "type target_event event reset-start\r\n\x1atype\r\n\x1atype target_event event halted\r\n"
                    .to_string(),
            )
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), ["reset-start", "halted"]);
    }

    #[test]
    fn reply_without_pending_command() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch("surprise".to_string()),
            Err(DispatchError::UnmatchedReply("surprise".to_string()))
        );
    }
}
