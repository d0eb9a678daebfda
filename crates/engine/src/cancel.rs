//! Cancellation of blocking waits
//!
//! A blocked `take_until` / `read_until` returns `Err(Error::Cancelled)` once
//! its token is cancelled, which keeps cancellation distinguishable from a
//! wakeup that simply found no match yet.

use crate::events::CallbackScope;
use crate::space::SpaceInner;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Cancels blocking waits on the space that issued it
///
/// Tokens are cheap to clone; all clones share one flag. Cancellation is
/// sticky: every later wait using the token fails immediately.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    space: Weak<SpaceInner>,
}

impl CancelToken {
    pub(crate) fn new(space: Weak<SpaceInner>) -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            space,
        }
    }

    /// Cancel every wait using this token and wake them up
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);

        let Some(inner) = self.space.upgrade() else {
            return;
        };

        if CallbackScope::is_active(inner.id) {
            // This thread already holds the space lock, so no waiter can be
            // between its flag check and its wait.
            inner.changed.notify_all();
            return;
        }

        // Lock before notifying to prevent lost-wakeup: a waiter holds this
        // lock from its flag check until it is parked on the condvar.
        let _state = inner.state.lock();
        inner.changed.notify_all();
    }

    /// Has `cancel` been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn is_bound_to(&self, inner: &Arc<SpaceInner>) -> bool {
        std::ptr::eq(self.space.as_ptr(), Arc::as_ptr(inner))
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
