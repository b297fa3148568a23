use std::panic::{AssertUnwindSafe, catch_unwind};

/// Invokes every callback once, fire-and-forget.
///
/// Callers must not rely on the order of invocation. Nothing is collected from the
/// callbacks: a panicking callback is logged and the remaining ones still run.
/// Returns the number of callbacks invoked.
pub fn fan_out<F: FnOnce()>(callbacks: impl IntoIterator<Item = F>) -> usize {
    let mut count = 0;
    for callback in callbacks {
        if catch_unwind(AssertUnwindSafe(callback)).is_err() {
            log::error!("Callback panicked, continuing with remaining callbacks");
        }
        count += 1;
    }
    count
}

#[test]
fn fan_out_survives_panics() {
    use std::cell::Cell;

    let calls = Cell::new(0);
    let callbacks: Vec<Box<dyn FnOnce() + '_>> = vec![
        Box::new(|| calls.set(calls.get() + 1)),
        Box::new(|| panic!("handler failure")),
        Box::new(|| calls.set(calls.get() + 1)),
    ];
    assert_eq!(fan_out(callbacks), 3);
    assert_eq!(calls.get(), 2);
}
