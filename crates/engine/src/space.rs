//! The tuple space
//!
//! A `TupleSpace` is a shared, insertion-ordered multiset of tuples guarded by
//! one mutex, with a condition variable that wakes blocked retrievals whenever
//! the contents may have changed. Every operation is atomic with respect to every
//! other operation on the same space.
//!
//! ## Retrieval
//!
//! - `take` / `read` block until a matching tuple is present
//! - `take_until` / `read_until` block until a match or until their
//!   `CancelToken` is cancelled
//! - `take_timeout` / `read_timeout` block until a match or a deadline
//! - `try_take` / `try_read` never block
//! - `take_all` / `read_all` return every current match
//!
//! Among several matching tuples the earliest inserted is selected.
//!
//! ## Callbacks
//!
//! Registered callbacks fire while the space lock is held (see
//! [`crate::events`]). Calling back into the same space from inside one of
//! its callbacks fails with `Error::ReentrantCall` instead of deadlocking.

use crate::cancel::CancelToken;
use crate::events::{self, Callback, CallbackScope, EventMode, EventTiming, Registry};
use linda_core::{Error, Limits, Result, Template, Tuple};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

static NEXT_SPACE_ID: AtomicU64 = AtomicU64::new(1);

/// Operation counters, reported by `TupleSpace::stats`
#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    writes: u64,
    taken: u64,
    read: u64,
    callbacks_fired: u64,
    callback_failures: u64,
}

/// Everything protected by the space lock
pub(crate) struct SpaceState {
    /// Tuples in insertion order
    tuples: Vec<Tuple>,
    registry: Registry,
    counters: Counters,
}

impl SpaceState {
    fn new() -> Self {
        SpaceState {
            tuples: Vec::new(),
            registry: Registry::new(),
            counters: Counters::default(),
        }
    }

    /// First matching tuple, removed or copied
    fn retrieve(&mut self, template: &Template, how: Retrieval) -> Option<Tuple> {
        let pos = self.tuples.iter().position(|t| template.matches(t))?;
        match how {
            Retrieval::Take => {
                self.counters.taken += 1;
                Some(self.tuples.remove(pos))
            }
            Retrieval::Read => {
                self.counters.read += 1;
                Some(self.tuples[pos].clone())
            }
        }
    }
}

pub(crate) struct SpaceInner {
    pub(crate) id: u64,
    pub(crate) state: Mutex<SpaceState>,
    /// Signalled on every change that may satisfy a blocked retrieval
    pub(crate) changed: Condvar,
    limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retrieval {
    Take,
    Read,
}

impl Retrieval {
    fn for_mode(mode: EventMode) -> Self {
        match mode {
            EventMode::Take => Retrieval::Take,
            EventMode::Read => Retrieval::Read,
        }
    }
}

/// How long a blocking retrieval may wait
#[derive(Clone, Copy)]
enum Wait<'a> {
    Forever,
    Cancellable(&'a CancelToken),
    Deadline(Instant),
}

impl Wait<'_> {
    /// Deadline `timeout` from now; too far to represent means no deadline
    fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Deadline(deadline),
            None => Wait::Forever,
        }
    }
}

/// Point-in-time view of a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceStats {
    /// Tuples currently stored
    pub tuples: usize,
    /// Registrations waiting to fire
    pub pending_registrations: usize,
    /// Pending registrations in TAKE mode
    pub pending_take_registrations: usize,
    /// Successful writes
    pub writes: u64,
    /// Stored tuples removed by take-family operations and immediate TAKE registrations
    pub tuples_taken: u64,
    /// Stored tuples copied out by read-family operations and immediate READ registrations
    pub tuples_read: u64,
    /// Callbacks invoked
    pub callbacks_fired: u64,
    /// Callbacks that returned an error or panicked
    pub callback_failures: u64,
}

/// A Linda tuple space
///
/// Cloning is cheap and every clone refers to the same space, so a space can
/// be handed to as many threads as needed.
///
/// # Example
///
/// ```
/// use linda_engine::{template, tuple, TupleSpace, ValueType};
///
/// let space = TupleSpace::new();
/// space.write(tuple![42, "hello"])?;
///
/// let found = space.take(&template![ValueType::Int, ValueType::String])?;
/// assert_eq!(found, tuple![42, "hello"]);
/// # Ok::<(), linda_engine::Error>(())
/// ```
#[derive(Clone)]
pub struct TupleSpace {
    inner: Arc<SpaceInner>,
}

impl TupleSpace {
    /// Create an empty space with default limits
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Create an empty space that rejects tuples and templates beyond `limits`
    pub fn with_limits(limits: Limits) -> Self {
        let id = NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            space = id,
            max_arity = limits.max_arity,
            max_depth = limits.max_depth,
            "tuple space created"
        );
        TupleSpace {
            inner: Arc::new(SpaceInner {
                id,
                state: Mutex::new(SpaceState::new()),
                changed: Condvar::new(),
                limits,
            }),
        }
    }

    /// Process-unique id of this space, as it appears in log events
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Limits enforced on written tuples and supplied templates
    pub fn limits(&self) -> Limits {
        self.inner.limits
    }

    /// Issue a token that can cancel `take_until` / `read_until` waits on
    /// this space
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::new(Arc::downgrade(&self.inner))
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Add a tuple to the space
    ///
    /// Pending registrations are notified first: every matching READ
    /// registration fires with a copy, and the earliest matching TAKE
    /// registration receives the tuple itself, in which case it is not
    /// inserted. Blocked retrievals are woken either way.
    pub fn write(&self, tuple: Tuple) -> Result<()> {
        self.check_reentry("write")?;
        self.inner
            .limits
            .validate_tuple(&tuple)
            .map_err(Error::InvalidTuple)?;

        let mut state = self.inner.state.lock();
        state.counters.writes += 1;

        let triggered = state.registry.take_triggered(&tuple);
        for registration in triggered.reads {
            self.fire(
                &mut state,
                registration.id,
                registration.mode,
                registration.callback,
                tuple.clone(),
            );
        }

        match triggered.take {
            Some(registration) => {
                trace!(
                    space = self.inner.id,
                    registration = registration.id,
                    "write delivered to take registration"
                );
                self.fire(
                    &mut state,
                    registration.id,
                    registration.mode,
                    registration.callback,
                    tuple,
                );
            }
            None => state.tuples.push(tuple),
        }

        self.inner.changed.notify_all();
        Ok(())
    }

    // ========================================================================
    // Blocking retrieval
    // ========================================================================

    /// Remove and return a matching tuple, waiting as long as necessary
    pub fn take(&self, template: &Template) -> Result<Tuple> {
        self.wait_for("take", template, Retrieval::Take, Wait::Forever)?
            .ok_or(Error::Cancelled)
    }

    /// Return a copy of a matching tuple, waiting as long as necessary
    pub fn read(&self, template: &Template) -> Result<Tuple> {
        self.wait_for("read", template, Retrieval::Read, Wait::Forever)?
            .ok_or(Error::Cancelled)
    }

    /// Like `take`, but fails with `Error::Cancelled` once `token` is cancelled
    ///
    /// A cancelled wait never consumes a tuple.
    pub fn take_until(&self, template: &Template, token: &CancelToken) -> Result<Tuple> {
        self.wait_for("take_until", template, Retrieval::Take, Wait::Cancellable(token))?
            .ok_or(Error::Cancelled)
    }

    /// Like `read`, but fails with `Error::Cancelled` once `token` is cancelled
    pub fn read_until(&self, template: &Template, token: &CancelToken) -> Result<Tuple> {
        self.wait_for("read_until", template, Retrieval::Read, Wait::Cancellable(token))?
            .ok_or(Error::Cancelled)
    }

    /// Like `take`, but gives up after `timeout` and returns `None`
    pub fn take_timeout(&self, template: &Template, timeout: Duration) -> Result<Option<Tuple>> {
        self.wait_for("take_timeout", template, Retrieval::Take, Wait::after(timeout))
    }

    /// Like `read`, but gives up after `timeout` and returns `None`
    pub fn read_timeout(&self, template: &Template, timeout: Duration) -> Result<Option<Tuple>> {
        self.wait_for("read_timeout", template, Retrieval::Read, Wait::after(timeout))
    }

    /// Wait loop shared by every blocking retrieval
    ///
    /// Returns `Ok(None)` only when a deadline passes.
    fn wait_for(
        &self,
        op: &'static str,
        template: &Template,
        how: Retrieval,
        wait: Wait<'_>,
    ) -> Result<Option<Tuple>> {
        self.check_reentry(op)?;
        self.validate_template(template)?;
        if let Wait::Cancellable(token) = wait {
            if !token.is_bound_to(&self.inner) {
                return Err(Error::InvalidOperation(format!(
                    "{} given a cancel token issued by another space",
                    op
                )));
            }
        }

        let mut state = self.inner.state.lock();
        loop {
            if let Wait::Cancellable(token) = wait {
                if token.is_cancelled() {
                    debug!(space = self.inner.id, op, "wait cancelled");
                    return Err(Error::Cancelled);
                }
            }

            if let Some(tuple) = state.retrieve(template, how) {
                return Ok(Some(tuple));
            }

            match wait {
                Wait::Forever | Wait::Cancellable(_) => self.inner.changed.wait(&mut state),
                Wait::Deadline(deadline) => {
                    if Instant::now() >= deadline {
                        trace!(space = self.inner.id, op, "wait timed out");
                        return Ok(None);
                    }
                    // Timeout is detected on the next pass, after one last match attempt
                    let _ = self.inner.changed.wait_until(&mut state, deadline);
                }
            }
        }
    }

    // ========================================================================
    // Non-blocking retrieval
    // ========================================================================

    /// Remove and return a matching tuple if one is present
    pub fn try_take(&self, template: &Template) -> Result<Option<Tuple>> {
        self.try_retrieve("try_take", template, Retrieval::Take)
    }

    /// Return a copy of a matching tuple if one is present
    pub fn try_read(&self, template: &Template) -> Result<Option<Tuple>> {
        self.try_retrieve("try_read", template, Retrieval::Read)
    }

    fn try_retrieve(
        &self,
        op: &'static str,
        template: &Template,
        how: Retrieval,
    ) -> Result<Option<Tuple>> {
        self.check_reentry(op)?;
        self.validate_template(template)?;
        let mut state = self.inner.state.lock();
        Ok(state.retrieve(template, how))
    }

    /// Remove and return every matching tuple, in insertion order
    pub fn take_all(&self, template: &Template) -> Result<Vec<Tuple>> {
        self.check_reentry("take_all")?;
        self.validate_template(template)?;

        let mut state = self.inner.state.lock();
        let (taken, kept): (Vec<Tuple>, Vec<Tuple>) = std::mem::take(&mut state.tuples)
            .into_iter()
            .partition(|t| template.matches(t));
        state.tuples = kept;
        state.counters.taken += taken.len() as u64;
        Ok(taken)
    }

    /// Return copies of every matching tuple, in insertion order
    pub fn read_all(&self, template: &Template) -> Result<Vec<Tuple>> {
        self.check_reentry("read_all")?;
        self.validate_template(template)?;

        let mut state = self.inner.state.lock();
        let found: Vec<Tuple> = state
            .tuples
            .iter()
            .filter(|t| template.matches(t))
            .cloned()
            .collect();
        state.counters.read += found.len() as u64;
        Ok(found)
    }

    // ========================================================================
    // Event registration
    // ========================================================================

    /// Register `callback` to receive a tuple matching `template`
    ///
    /// With `EventTiming::Immediate`, a tuple already in the space satisfies
    /// the registration at once (removed first in `EventMode::Take`) and the
    /// callback runs before this returns. Otherwise the registration stays
    /// pending until a matching write, and fires at most once.
    ///
    /// ```
    /// use linda_engine::{template, tuple, EventMode, EventTiming, TupleSpace, ValueType};
    /// use std::sync::mpsc;
    ///
    /// let space = TupleSpace::new();
    /// let (tx, rx) = mpsc::channel();
    /// space.event_register(
    ///     EventMode::Take,
    ///     EventTiming::Future,
    ///     template!["job", ValueType::Int],
    ///     move |t| {
    ///         tx.send(t)?;
    ///         Ok(())
    ///     },
    /// )?;
    ///
    /// space.write(tuple!["job", 7])?;
    /// assert_eq!(rx.recv().unwrap(), tuple!["job", 7]);
    /// assert!(space.is_empty()?);
    /// # Ok::<(), linda_engine::Error>(())
    /// ```
    pub fn event_register<F>(
        &self,
        mode: EventMode,
        timing: EventTiming,
        template: Template,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(Tuple) -> anyhow::Result<()> + Send + 'static,
    {
        self.register_callback(mode, timing, template, Box::new(callback))
    }

    /// `event_register` for an already boxed callback object
    pub fn register_callback(
        &self,
        mode: EventMode,
        timing: EventTiming,
        template: Template,
        callback: Box<dyn Callback>,
    ) -> Result<()> {
        self.check_reentry("event_register")?;
        self.validate_template(&template)?;

        let mut state = self.inner.state.lock();

        if timing == EventTiming::Immediate {
            if let Some(tuple) = state.retrieve(&template, Retrieval::for_mode(mode)) {
                let id = state.registry.allocate_id();
                debug!(
                    space = self.inner.id,
                    registration = id,
                    %mode,
                    "registration satisfied immediately"
                );
                self.fire(&mut state, id, mode, callback, tuple);
                self.inner.changed.notify_all();
                return Ok(());
            }
        }

        let id = state.registry.register(mode, timing, template, callback);
        debug!(
            space = self.inner.id,
            registration = id,
            %mode,
            %timing,
            pending = state.registry.len(),
            "registration pending"
        );
        Ok(())
    }

    fn fire(
        &self,
        state: &mut SpaceState,
        registration_id: u64,
        mode: EventMode,
        callback: Box<dyn Callback>,
        tuple: Tuple,
    ) {
        state.counters.callbacks_fired += 1;
        if !events::invoke(self.inner.id, registration_id, mode, callback, tuple) {
            state.counters.callback_failures += 1;
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Number of tuples in the space
    pub fn len(&self) -> Result<usize> {
        self.check_reentry("len")?;
        Ok(self.inner.state.lock().tuples.len())
    }

    /// Does the space hold no tuples
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of tuples matching `template`
    pub fn count(&self, template: &Template) -> Result<usize> {
        self.check_reentry("count")?;
        self.validate_template(template)?;
        let state = self.inner.state.lock();
        Ok(state.tuples.iter().filter(|t| template.matches(t)).count())
    }

    /// Remove every tuple; returns how many were removed
    ///
    /// Pending registrations are kept.
    pub fn clear(&self) -> Result<usize> {
        self.check_reentry("clear")?;
        let mut state = self.inner.state.lock();
        let removed = state.tuples.len();
        state.tuples.clear();
        debug!(space = self.inner.id, removed, "space cleared");
        Ok(removed)
    }

    /// Current counters and sizes
    pub fn stats(&self) -> Result<SpaceStats> {
        self.check_reentry("stats")?;
        let state = self.inner.state.lock();
        Ok(SpaceStats {
            tuples: state.tuples.len(),
            pending_registrations: state.registry.len(),
            pending_take_registrations: state.registry.count_mode(EventMode::Take),
            writes: state.counters.writes,
            tuples_taken: state.counters.taken,
            tuples_read: state.counters.read,
            callbacks_fired: state.counters.callbacks_fired,
            callback_failures: state.counters.callback_failures,
        })
    }

    /// Human-readable dump of the contents, each line starting with `prefix`
    ///
    /// The dump is also emitted as a `debug` log event.
    pub fn debug(&self, prefix: &str) -> Result<String> {
        self.check_reentry("debug")?;
        let state = self.inner.state.lock();
        let tuples = state
            .tuples
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let report = format!(
            "{prefix} Tuples in space: [{tuples}]\n{prefix} Registered callbacks: {}",
            state.registry.len()
        );
        debug!(space = self.inner.id, "{}", report);
        Ok(report)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Run `f` on the raw contents while holding the space lock
    ///
    /// Used by persistence so a save or load is atomic with respect to every
    /// other operation.
    pub(crate) fn with_contents<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Contents<'_>) -> R,
    ) -> Result<R> {
        self.check_reentry(op)?;
        let mut state = self.inner.state.lock();
        let mut contents = Contents {
            tuples: &mut state.tuples,
            limits: self.inner.limits,
            replaced: false,
        };
        let result = f(&mut contents);
        if contents.replaced {
            self.inner.changed.notify_all();
        }
        Ok(result)
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<SpaceInner> {
        &self.inner
    }

    fn check_reentry(&self, op: &'static str) -> Result<()> {
        if CallbackScope::is_active(self.inner.id) {
            return Err(Error::ReentrantCall(op));
        }
        Ok(())
    }

    fn validate_template(&self, template: &Template) -> Result<()> {
        self.inner
            .limits
            .validate_template(template)
            .map_err(Error::InvalidTemplate)
    }
}

impl Default for TupleSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TupleSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleSpace")
            .field("id", &self.inner.id)
            .field("limits", &self.inner.limits)
            .finish()
    }
}

/// Locked view of a space's tuples
pub(crate) struct Contents<'a> {
    tuples: &'a mut Vec<Tuple>,
    limits: Limits,
    replaced: bool,
}

impl Contents<'_> {
    pub(crate) fn tuples(&self) -> &[Tuple] {
        self.tuples
    }

    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Replace all tuples; blocked retrievals are woken afterwards
    pub(crate) fn replace(&mut self, tuples: Vec<Tuple>) {
        *self.tuples = tuples;
        self.replaced = true;
    }
}
