//! Event registrations and the write-triggered notification protocol
//!
//! A registration is `(mode, timing, template, callback)`. It is consumed the
//! first time it fires and is never reconsidered afterwards.
//!
//! On every write the registry is asked which pending registrations match the
//! new tuple:
//! - every matching READ registration fires with its own copy
//! - at most one matching TAKE registration fires, the earliest registered;
//!   it receives the tuple itself and the tuple is not inserted
//! - other matching TAKE registrations stay pending
//!
//! Callbacks run on the caller's thread while the space lock is held. A
//! callback that returns an error or panics is logged and counted; it never
//! rolls back the registration removal or the space mutation.

use linda_core::{Template, Tuple};
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Whether a firing registration consumes the tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventMode {
    /// Remove the matched tuple from the space
    Take,
    /// Observe only; the space is unchanged
    Read,
}

/// Whether current contents are checked at registration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTiming {
    /// Check the space now, and fall back to waiting for a future write
    Immediate,
    /// Only future writes can fire the registration
    Future,
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventMode::Take => f.write_str("take"),
            EventMode::Read => f.write_str("read"),
        }
    }
}

impl fmt::Display for EventTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTiming::Immediate => f.write_str("immediate"),
            EventTiming::Future => f.write_str("future"),
        }
    }
}

/// Callback invoked with a copy of the matched tuple
///
/// Implemented for every `FnOnce(Tuple) -> anyhow::Result<()> + Send`.
/// Callbacks run while the space is locked: they must be quick, must not
/// block, and must not call back into the space that fired them (such calls
/// fail with `Error::ReentrantCall`).
///
/// A callback may call into another space, but that nests the other space's
/// lock inside this one. If a callback on space B can in turn call into space
/// A while another thread writes to B, the two threads deadlock; the
/// reentrancy check only sees calls on the current thread's own space.
pub trait Callback: Send + 'static {
    /// Deliver the tuple
    fn call(self: Box<Self>, tuple: Tuple) -> anyhow::Result<()>;
}

impl<F> Callback for F
where
    F: FnOnce(Tuple) -> anyhow::Result<()> + Send + 'static,
{
    fn call(self: Box<Self>, tuple: Tuple) -> anyhow::Result<()> {
        (*self)(tuple)
    }
}

/// A pending registration
pub(crate) struct Registration {
    pub(crate) id: u64,
    pub(crate) mode: EventMode,
    pub(crate) timing: EventTiming,
    pub(crate) template: Template,
    pub(crate) callback: Box<dyn Callback>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("timing", &self.timing)
            .field("template", &self.template)
            .field("callback", &"<callback>")
            .finish()
    }
}

/// Registrations fired by one write
#[derive(Debug, Default)]
pub(crate) struct Triggered {
    /// Every matching READ registration, in registration order
    pub(crate) reads: Vec<Registration>,
    /// The earliest matching TAKE registration
    pub(crate) take: Option<Registration>,
}

/// Pending registrations in registration order
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pending: Vec<Registration>,
    next_id: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a registration; returns its id
    pub(crate) fn register(
        &mut self,
        mode: EventMode,
        timing: EventTiming,
        template: Template,
        callback: Box<dyn Callback>,
    ) -> u64 {
        let id = self.allocate_id();
        self.pending.push(Registration {
            id,
            mode,
            timing,
            template,
            callback,
        });
        id
    }

    /// Id for a registration that fires without ever being stored
    pub(crate) fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Remove and return the registrations a write of `tuple` fires
    ///
    /// Non-fired registrations keep their relative order.
    pub(crate) fn take_triggered(&mut self, tuple: &Tuple) -> Triggered {
        let mut triggered = Triggered::default();
        let mut i = 0;
        while i < self.pending.len() {
            let candidate = &self.pending[i];
            let fires = candidate.template.matches(tuple)
                && (candidate.mode == EventMode::Read || triggered.take.is_none());
            if !fires {
                i += 1;
                continue;
            }
            let registration = self.pending.remove(i);
            match registration.mode {
                EventMode::Read => triggered.reads.push(registration),
                EventMode::Take => triggered.take = Some(registration),
            }
        }
        triggered
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn count_mode(&self, mode: EventMode) -> usize {
        self.pending.iter().filter(|r| r.mode == mode).count()
    }
}

// ============================================================================
// Callback invocation
// ============================================================================

thread_local! {
    /// Ids of the spaces whose callbacks are running on this thread
    static ACTIVE_SPACES: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as running a callback of one space
///
/// Popped on drop, so a panicking callback still leaves the stack balanced.
pub(crate) struct CallbackScope {
    space_id: u64,
}

impl CallbackScope {
    pub(crate) fn enter(space_id: u64) -> Self {
        ACTIVE_SPACES.with(|active| active.borrow_mut().push(space_id));
        CallbackScope { space_id }
    }

    /// Is a callback of `space_id` running on this thread
    pub(crate) fn is_active(space_id: u64) -> bool {
        ACTIVE_SPACES.with(|active| active.borrow().contains(&space_id))
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        ACTIVE_SPACES.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.space_id) {
                active.remove(pos);
            }
        });
    }
}

/// Invoke a callback, catching errors and panics
///
/// Returns `true` if the callback completed successfully.
pub(crate) fn invoke(
    space_id: u64,
    registration_id: u64,
    mode: EventMode,
    callback: Box<dyn Callback>,
    tuple: Tuple,
) -> bool {
    let _scope = CallbackScope::enter(space_id);
    match panic::catch_unwind(AssertUnwindSafe(move || callback.call(tuple))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(
                space = space_id,
                registration = registration_id,
                %mode,
                error = %e,
                "event callback failed"
            );
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("(non-string panic)");
            error!(
                space = space_id,
                registration = registration_id,
                %mode,
                "event callback panicked: {}",
                message
            );
            false
        }
    }
}
