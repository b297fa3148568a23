use std::collections::HashMap;

use crate::fan_out::fan_out;

/// A one-shot callback waiting for the target to reach a state.
pub type Waiter = Box<dyn FnOnce() + Send>;

/// Tracks the last reported execution state of the target (e.g. `halted`, `running`)
/// together with the callbacks waiting for a particular state.
#[derive(Default)]
pub struct StateTracker {
    current: Option<String>,
    waiters: HashMap<String, Vec<Waiter>>,
}

impl StateTracker {
    pub fn new() -> StateTracker {
        StateTracker::default()
    }

    /// The current state, `None` before the first state change was observed.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Sets the current state and fires all waiters registered for it.
    /// Waiters for other states stay registered.
    pub fn update(&mut self, state: impl Into<String>) {
        let state = state.into();
        log::debug!("Target state {}", state);
        let waiters = self.waiters.remove(&state).unwrap_or_default();
        self.current = Some(state);
        fan_out(waiters);
    }

    /// Runs `waiter` once the target is in `state`.
    ///
    /// If the target already is in `state`, `waiter` runs before this function returns
    /// and is not registered.
    pub fn when(&mut self, state: impl Into<String>, waiter: Waiter) {
        let state = state.into();
        if self.current.as_ref() == Some(&state) {
            fan_out([waiter]);
        } else {
            self.waiters.entry(state).or_default().push(waiter);
        }
    }

    /// The number of waiters registered for `state`.
    pub fn waiting(&self, state: &str) -> usize {
        self.waiters.get(state).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.waiters.clear();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::StateTracker;

    fn counting_waiter(counter: &Arc<AtomicUsize>) -> Box<dyn FnOnce() + Send> {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn starts_without_state() {
        assert_eq!(StateTracker::new().current(), None);
    }

    #[test]
    fn waiter_fires_once() {
        let mut tracker = StateTracker::new();
        tracker.update("halted");
        let fired = Arc::new(AtomicUsize::new(0));
        tracker.when("running", counting_waiter(&fired));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tracker.update("running");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.current(), Some("running"));

        tracker.update("halted");
        tracker.update("running");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn waiter_fires_immediately_in_current_state() {
        let mut tracker = StateTracker::new();
        tracker.update("halted");
        let fired = Arc::new(AtomicUsize::new(0));
        tracker.when("halted", counting_waiter(&fired));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.waiting("halted"), 0);

        tracker.update("halted");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_immediate_waiter_is_contained() {
        let mut tracker = StateTracker::new();
        tracker.update("halted");
        tracker.when("halted", Box::new(|| panic!("waiter failed")));

        let fired = Arc::new(AtomicUsize::new(0));
        tracker.when("running", counting_waiter(&fired));
        tracker.update("running");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.current(), Some("running"));
    }

    #[test]
    fn other_states_keep_their_waiters() {
        let mut tracker = StateTracker::new();
        let halted = Arc::new(AtomicUsize::new(0));
        let reset = Arc::new(AtomicUsize::new(0));
        tracker.when("halted", counting_waiter(&halted));
        tracker.when("halted", counting_waiter(&halted));
        tracker.when("reset", counting_waiter(&reset));

        tracker.update("halted");
        assert_eq!(halted.load(Ordering::SeqCst), 2);
        assert_eq!(reset.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.waiting("reset"), 1);
    }
}
