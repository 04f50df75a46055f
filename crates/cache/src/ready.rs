//! One-shot readiness latch.

use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex},
};

use tracing::warn;

type Callback = Box<dyn FnOnce() + Send>;

enum GateState {
    Pending(Vec<Callback>),
    Open,
}

/// Callbacks registered before [`ReadyGate::open`] are queued and run in
/// registration order when the gate opens; callbacks registered afterwards
/// run immediately. The gate never closes again.
#[derive(Clone)]
pub struct ReadyGate {
    state: Arc<Mutex<GateState>>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::Pending(Vec::new()))),
        }
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(|e| e.into_inner()),
            GateState::Open
        )
    }

    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let GateState::Pending(queue) = &mut *state {
                queue.push(Box::new(callback));
                return;
            }
        }
        run_isolated(Box::new(callback));
    }

    /// Open the gate and flush queued callbacks. Returns `false` if it was
    /// already open.
    pub fn open(&self) -> bool {
        let queued = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *state, GateState::Open) {
                GateState::Pending(queue) => queue,
                GateState::Open => return false,
            }
        };
        for callback in queued {
            run_isolated(callback);
        }
        true
    }
}

impl fmt::Debug for ReadyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyGate")
            .field("open", &self.is_open())
            .finish()
    }
}

fn run_isolated(callback: Callback) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(callback)) {
        warn!(panic = %panic_text(panic.as_ref()), "ready callback panicked");
    }
}

fn panic_text(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
