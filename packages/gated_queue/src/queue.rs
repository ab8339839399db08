use std::any::type_name;
use std::cell::RefCell;
use std::{fmt, mem};

use parking_lot::ReentrantMutex;
use tracing::{debug, error, trace};

use crate::builder::Observer;
use crate::error::Result;
use crate::metrics::{JOBS_DEFERRED, JOBS_DRAINED};
use crate::{DrainOrder, Error, Gate, GatedJobQueueBuilder};

type Job = Box<dyn FnOnce() + Send>;

/// Runs jobs immediately while a gate is open and holds them back while it is closed.
///
/// The gate is a predicate supplied by the host, read on every [`add()`][Self::add] and
/// [`trigger()`][Self::trigger]. Jobs added while the gate is closed wait in a backlog until a
/// `trigger()` finds the gate open, or until an `add()` finds it open and runs the backlog right
/// after its own job.
///
/// # Ordering
///
/// By default, `trigger()` runs the backlog oldest first while `add()` runs it newest first.
/// Both orders are configurable through [`GatedJobQueueBuilder`].
///
/// # Re-entrancy
///
/// Jobs may use the queue they run on. A job added while the queue is running jobs is not run
/// in the middle of the current batch. It waits for the next round, which the running `add()` or
/// `trigger()` starts after the current batch if the gate is still open.
///
/// # Thread safety
///
/// The queue is `Send + Sync`. Reading the gate, updating the backlog and running jobs all
/// happen under one lock, so jobs of one queue never run in parallel.
///
/// # Panics
///
/// If the gate is read as open for the second time in a row while jobs are still waiting,
/// the queue was serviced incorrectly and every operation that reads the gate panics. Use
/// [`try_trigger()`][Self::try_trigger] to receive an [`Error`] instead.
///
/// A panic in a job propagates to the caller of `add()` or `trigger()`. Jobs of the same batch
/// that had not started yet are dropped. If the job passed to `add()` panics, the backlog it would
/// have run stays waiting, as do jobs that the panicking job added. Either way, the next `add()` or
/// `trigger()` that finds the gate open runs them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// use gated_queue::GatedJobQueue;
///
/// let ready = Arc::new(AtomicBool::new(false));
///
/// let queue = GatedJobQueue::new({
///     let ready = Arc::clone(&ready);
///     move || ready.load(Ordering::Relaxed)
/// });
///
/// queue.add(|| println!("first"));
/// queue.add(|| println!("second"));
/// assert_eq!(queue.len(), 2);
///
/// ready.store(true, Ordering::Relaxed);
/// assert_eq!(queue.trigger(), 2);
/// assert!(queue.is_empty());
///
/// // The gate is open, so this runs right away.
/// queue.add(|| println!("third"));
/// assert!(queue.is_empty());
/// ```
pub struct GatedJobQueue {
    gate: Box<dyn Gate>,
    state: ReentrantMutex<RefCell<QueueState>>,

    on_add: Option<Observer>,
    on_remove: Option<Observer>,

    add_drain_order: DrainOrder,
    trigger_drain_order: DrainOrder,
}

struct QueueState {
    /// Oldest first.
    pending: Vec<Job>,

    /// The gate value as of the last read.
    gate_was_open: bool,

    /// Set while this queue is running jobs. Only ever observed as `true` by the thread running
    /// the jobs, because it holds the lock while doing so.
    draining: bool,
}

impl GatedJobQueue {
    /// Creates a queue controlled by `gate`, with default drain orders and no observers.
    #[must_use]
    pub fn new(gate: impl Gate) -> Self {
        Self::builder(gate).build()
    }

    /// Starts building a queue controlled by `gate`.
    pub fn builder(gate: impl Gate) -> GatedJobQueueBuilder {
        GatedJobQueueBuilder::new(gate)
    }

    pub(crate) fn new_inner(
        gate: Box<dyn Gate>,
        on_add: Option<Observer>,
        on_remove: Option<Observer>,
        add_drain_order: DrainOrder,
        trigger_drain_order: DrainOrder,
    ) -> Self {
        let gate_was_open = gate.can_execute();

        Self {
            gate,
            state: ReentrantMutex::new(RefCell::new(QueueState {
                pending: Vec::new(),
                gate_was_open,
                draining: false,
            })),
            on_add,
            on_remove,
            add_drain_order,
            trigger_drain_order,
        }
    }

    /// Runs `job` now if the gate is open, otherwise adds it to the backlog.
    ///
    /// If the gate is open, the backlog is run right after `job`, in the add drain order.
    ///
    /// # Panics
    ///
    /// Panics if the gate is found open with jobs waiting (see the type-level documentation)
    /// or if `job` or a backlog job panics.
    pub fn add(&self, job: impl FnOnce() + Send + 'static) {
        let ran_backlog = {
            let state = self.state.lock();

            let is_open = self
                .read_gate(&state)
                .unwrap_or_else(|error| invariant_violated(&error));

            if !is_open || state.borrow().draining {
                state.borrow_mut().pending.push(Box::new(job));
                None
            } else {
                Some(self.drain(&state, Some(Box::new(job)), self.add_drain_order, false))
            }
        };

        match ran_backlog {
            None => {
                JOBS_DEFERRED.with(|e| e.observe_once());
                trace!("job deferred until the gate opens");

                if let Some(on_add) = &self.on_add {
                    on_add();
                }
            }
            Some(drained) => self.report_removed(drained),
        }
    }

    /// Runs the backlog if the gate is open. Returns the number of backlog jobs that ran.
    ///
    /// # Panics
    ///
    /// Panics if the gate is found open with jobs waiting (see the type-level documentation)
    /// or if a backlog job panics.
    pub fn trigger(&self) -> usize {
        self.try_trigger(false).unwrap_or_else(|error| invariant_violated(&error))
    }

    /// Runs the backlog whether the gate is open or not. Returns the number of backlog jobs that
    /// ran.
    ///
    /// The gate is still read, to keep the remembered gate state current.
    ///
    /// # Panics
    ///
    /// Panics if the gate is found open with jobs waiting (see the type-level documentation)
    /// or if a backlog job panics.
    pub fn force_trigger(&self) -> usize {
        self.try_trigger(true).unwrap_or_else(|error| invariant_violated(&error))
    }

    /// Same as [`trigger()`][Self::trigger] when `force` is `false` and
    /// [`force_trigger()`][Self::force_trigger] when it is `true`, except that finding the gate
    /// open with jobs waiting is returned as an error instead of panicking.
    ///
    /// When called from inside a job of the same queue, this only reads the gate. The backlog is
    /// then run by the `add()` or `trigger()` that is already running jobs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OpenGateWithBacklog`] if the gate is open and was open at the previous
    /// read while jobs are waiting. The backlog is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if a backlog job panics.
    pub fn try_trigger(&self, force: bool) -> Result<usize> {
        let drained = {
            let state = self.state.lock();

            let is_open = self.read_gate(&state)?;

            if state.borrow().draining || !(is_open || force) {
                0
            } else {
                self.drain(&state, None, self.trigger_drain_order, force)
            }
        };

        self.report_removed(drained);

        Ok(drained)
    }

    /// Whether no job is waiting in the backlog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().borrow().pending.is_empty()
    }

    /// The number of jobs waiting in the backlog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().borrow().pending.len()
    }

    /// Reads the gate and remembers the value.
    ///
    /// An open gate that was already open at the previous read must not have jobs waiting,
    /// unless we are in the middle of running them.
    fn read_gate(&self, state: &RefCell<QueueState>) -> Result<bool> {
        // Read before borrowing, in case the gate looks at the queue.
        let is_open = self.gate.can_execute();

        let mut state = state.borrow_mut();

        if mem::replace(&mut state.gate_was_open, is_open) != is_open {
            debug!(is_open, "gate changed");
            return Ok(is_open);
        }

        if is_open && !state.draining && !state.pending.is_empty() {
            return Err(Error::OpenGateWithBacklog {
                pending: state.pending.len(),
            });
        }

        Ok(is_open)
    }

    /// Runs `first` (if any), then the backlog, then whatever the jobs added to the backlog while
    /// running, for as long as the gate stays open or `force` is set.
    ///
    /// The backlog is only taken out of the state after `first` has returned.
    ///
    /// Returns the number of backlog jobs that ran.
    fn drain(
        &self,
        state: &RefCell<QueueState>,
        first: Option<Job>,
        order: DrainOrder,
        force: bool,
    ) -> usize {
        state.borrow_mut().draining = true;

        let _draining = scopeguard::guard(state, |state| {
            let mut state = state.borrow_mut();
            state.draining = false;

            // Jobs still waiting were left behind by a closed gate or by a panic. The next read
            // of an open gate must count as a change, so that it runs them.
            if !state.pending.is_empty() {
                state.gate_was_open = false;
            }
        });

        let mut batch = match first {
            Some(job) => {
                let backlog = state.borrow().pending.len();

                // If this panics, the backlog is still in place for the next drain.
                job();

                // Jobs added by `job` itself wait for the next round.
                let mut state = state.borrow_mut();
                let added_by_job = state.pending.split_off(backlog);
                mem::replace(&mut state.pending, added_by_job)
            }
            None => mem::take(&mut state.borrow_mut().pending),
        };

        let mut drained: usize = 0;

        loop {
            if !batch.is_empty() {
                drained = drained
                    .checked_add(batch.len())
                    .expect("cannot run more jobs than fit in memory");

                JOBS_DRAINED.with(|e| e.observe(batch.len()));
                debug!(jobs = batch.len(), ?order, "running backlog");

                run_batch(mem::take(&mut batch), order);
            }

            if state.borrow().pending.is_empty() {
                break;
            }

            if !force && !matches!(self.read_gate(state), Ok(true)) {
                debug!("gate closed while running jobs, leaving the rest for later");
                break;
            }

            batch = mem::take(&mut state.borrow_mut().pending);
        }

        drained
    }

    fn report_removed(&self, count: usize) {
        if let Some(on_remove) = &self.on_remove {
            for _ in 0..count {
                on_remove();
            }
        }
    }
}

fn run_batch(batch: Vec<Job>, order: DrainOrder) {
    match order {
        DrainOrder::OldestFirst => batch.into_iter().for_each(|job| job()),
        DrainOrder::NewestFirst => batch.into_iter().rev().for_each(|job| job()),
    }
}

fn invariant_violated(error: &Error) -> ! {
    error!(%error, "gated job queue invariant violated");
    panic!("{error}");
}

impl fmt::Debug for GatedJobQueue {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("has_on_add", &self.on_add.is_some())
            .field("has_on_remove", &self.on_remove.is_some())
            .field("add_drain_order", &self.add_drain_order)
            .field("trigger_drain_order", &self.trigger_drain_order)
            .finish_non_exhaustive()
    }
}
