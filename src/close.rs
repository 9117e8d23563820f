//! Close-handler registry.
//!
//! Handlers run exactly once, in registration order, whichever comes
//! first: an explicit close, a terminal operation finishing, iterator
//! exhaustion, or the owning stream being dropped (including while
//! unwinding from a panicking user closure).

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{debug, warn};

type Handler<'a> = Box<dyn FnOnce() + Send + 'a>;

#[derive(Default)]
pub(crate) struct CloseHandlers<'a> {
    handlers: Vec<Handler<'a>>,
}

impl<'a> CloseHandlers<'a> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, handler: impl FnOnce() + Send + 'a) {
        self.handlers.push(Box::new(handler));
    }

    /// Moves `other`'s handlers after this registry's own.
    pub(crate) fn append(&mut self, mut other: CloseHandlers<'a>) {
        self.handlers.append(&mut other.handlers);
    }

    /// Runs and forgets every pending handler.
    ///
    /// A panicking handler does not stop the rest. The first panic is
    /// re-raised once all handlers ran, unless this thread is already
    /// unwinding; later panics are only logged.
    pub(crate) fn run(&mut self) {
        if self.handlers.is_empty() {
            return;
        }
        debug!(count = self.handlers.len(), "running close handlers");

        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        for handler in self.handlers.drain(..) {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(handler)) {
                if first_panic.is_none() {
                    first_panic = Some(payload);
                } else {
                    warn!(
                        reason = panic_message(payload.as_ref()),
                        "close handler panicked; suppressed"
                    );
                }
            }
        }

        if let Some(payload) = first_panic {
            if thread::panicking() {
                warn!(
                    reason = panic_message(payload.as_ref()),
                    "close handler panicked during unwinding; suppressed"
                );
            } else {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl Drop for CloseHandlers<'_> {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for CloseHandlers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseHandlers")
            .field("pending", &self.handlers.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
