// src/proxy/cancel.rs
//! Cancelable results and reversal actions
//!
//! Every proxy creation returns its value wrapped together with a reversal
//! action that removes the registry entry and undoes the transformation.
//! Reversals run at most once: the underlying action is taken out of its
//! slot on the first run, so repeated cancellation is a guaranteed no-op.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Idempotent undo action.
///
/// Cloning shares the same one-shot slot, so a reversal composed into a
/// larger one still runs at most once overall.
#[derive(Clone)]
pub struct Reversal {
    action: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl Reversal {
    /// A reversal wrapping an undo action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// A reversal with nothing to undo.
    pub fn noop() -> Self {
        Self {
            action: Arc::new(Mutex::new(None)),
        }
    }

    /// Run the undo action. Subsequent calls do nothing.
    pub fn run(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            trace!("running reversal action");
            action();
        }
    }

    /// Whether the action has already run (or there was none to begin with).
    pub fn is_spent(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl std::fmt::Debug for Reversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reversal")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// A produced value paired with the action that uncreates it.
#[derive(Debug)]
pub struct Cancelable<T> {
    value: T,
    reversal: Reversal,
}

impl<T> Cancelable<T> {
    pub fn new(value: T, reversal: Reversal) -> Self {
        Self { value, reversal }
    }

    /// The produced value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The reversal action, shareable independently of the value.
    pub fn reversal(&self) -> Reversal {
        self.reversal.clone()
    }

    /// Undo the side effects of producing the value. Idempotent.
    pub fn cancel(&self) {
        self.reversal.run();
    }

    /// Split into value and reversal.
    pub fn into_parts(self) -> (T, Reversal) {
        (self.value, self.reversal)
    }
}
