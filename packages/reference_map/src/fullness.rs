use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::ReferenceMap;

/// Receives aggregate fullness changes of a [`ReferenceMap`].
///
/// The map is "full" while at least one of its groups is full. The listener is called with
/// `true` when the first group becomes full and with `false` when the last full group stops
/// being full, no matter how many groups are full at the same time in between.
///
/// Calls are made with no lock of the map held, so the listener may call back into the map.
/// Edges are delivered exactly once and in the order they happened, though an edge caused by
/// one thread may be delivered by another thread that is already delivering.
///
/// Any `Fn(&ReferenceMap<K, T>, bool)` closure that is `Send + Sync + 'static` is a listener.
pub trait FullnessListener<K, T: ?Sized>: Send + Sync {
    /// Called when the aggregate fullness of `map` changes to `is_full`.
    fn on_fullness_changed(&self, map: &ReferenceMap<K, T>, is_full: bool);
}

impl<K, T, F> FullnessListener<K, T> for F
where
    T: ?Sized,
    F: Fn(&ReferenceMap<K, T>, bool) + Send + Sync + 'static,
{
    fn on_fullness_changed(&self, map: &ReferenceMap<K, T>, is_full: bool) {
        self(map, is_full);
    }
}

/// Counts how many groups are currently full and turns per-group transitions into aggregate
/// edges.
///
/// Groups report their own transitions via [`signal()`][Self::signal]. The counter records an
/// aggregate edge only when the number of full groups moves from 0 to 1 or from 1 to 0. Edges
/// are queued and handed out by [`deliver()`][Self::deliver], which is meant to be called after
/// the caller has released any locks of its own.
///
/// # Example
///
/// ```
/// use reference_map::FullnessCounter;
///
/// let counter = FullnessCounter::new();
///
/// counter.signal(true);
/// counter.signal(true);
/// counter.signal(false);
/// assert_eq!(counter.full_groups(), 1);
///
/// let mut edges = Vec::new();
/// counter.deliver(|is_full| edges.push(is_full));
/// assert_eq!(edges, [true]);
/// ```
pub struct FullnessCounter {
    state: Mutex<CounterState>,

    // Held by whoever is currently handing edges to a callback. Never waited on, only tried.
    delivery: Mutex<()>,
}

#[derive(Debug, Default)]
struct CounterState {
    full_groups: usize,

    /// Aggregate edges not yet handed to a callback, oldest first.
    undelivered: VecDeque<bool>,
}

impl FullnessCounter {
    /// Creates a counter with no full groups and no pending edges.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CounterState::default()),
            delivery: Mutex::new(()),
        }
    }

    /// Records that one group became full (`true`) or stopped being full (`false`).
    ///
    /// # Panics
    ///
    /// Panics if a group reports that it stopped being full while no group is counted as full.
    pub fn signal(&self, is_full: bool) {
        let mut state = self.state.lock();

        if is_full {
            state.full_groups = state
                .full_groups
                .checked_add(1)
                .expect("more full groups than addressable memory can hold is impossible");

            if state.full_groups == 1 {
                state.undelivered.push_back(true);
            }
        } else {
            state.full_groups = state.full_groups.checked_sub(1).expect(
                "a group reported that it stopped being full but no group was counted as full",
            );

            if state.full_groups == 0 {
                state.undelivered.push_back(false);
            }
        }
    }

    /// Forgets `count` full groups at once, queueing at most one "became empty" edge.
    ///
    /// Used for bulk teardown, where per-group transitions are not reported.
    pub(crate) fn release(&self, count: usize) {
        if count == 0 {
            return;
        }

        let mut state = self.state.lock();

        state.full_groups = state
            .full_groups
            .checked_sub(count)
            .expect("released more full groups than were counted as full");

        if state.full_groups == 0 {
            state.undelivered.push_back(false);
        }
    }

    /// The number of groups currently counted as full.
    #[must_use]
    pub fn full_groups(&self) -> usize {
        self.state.lock().full_groups
    }

    /// Whether at least one group is currently full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full_groups() > 0
    }

    /// Hands every queued aggregate edge to `callback`, oldest first.
    ///
    /// Only one thread delivers at a time. If another thread (or an outer call on this thread,
    /// when `callback` re-enters code that signals the counter) is already delivering, this
    /// returns immediately and the active deliverer picks up the queued edges instead.
    ///
    /// No lock of the counter is held while `callback` runs.
    pub fn deliver(&self, mut callback: impl FnMut(bool)) {
        loop {
            let Some(delivering) = self.delivery.try_lock() else {
                return;
            };

            while let Some(is_full) = self.pop_undelivered() {
                debug!(is_full, "delivering aggregate fullness edge");
                callback(is_full);
            }

            drop(delivering);

            // An edge may have been queued after our last pop but before we released the
            // delivery lock, by a thread that then failed to take the delivery lock.
            if !self.has_undelivered() {
                return;
            }
        }
    }

    fn pop_undelivered(&self) -> Option<bool> {
        self.state.lock().undelivered.pop_front()
    }

    fn has_undelivered(&self) -> bool {
        !self.state.lock().undelivered.is_empty()
    }
}

impl Default for FullnessCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FullnessCounter {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("FullnessCounter")
            .field("full_groups", &state.full_groups)
            .field("undelivered", &state.undelivered.len())
            .finish_non_exhaustive()
    }
}
