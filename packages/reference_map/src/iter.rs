use std::any::type_name;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::{Entry, GroupId, GroupSnapshot, ReferenceMap};

/// Iterator over the items registered under one key of a [`ReferenceMap`], newest registration
/// first.
///
/// Obtained from [`ReferenceMap::iterator()`]. Depending on how the map was built, the iterator
/// either walks a snapshot taken when it was created or walks the live group, taking the map's
/// lock for each step. Either way it can be rewound with [`restart()`][Self::restart].
///
/// A live iterator stays with its group if [`ReferenceMap::move_key()`] hands the group to a key
/// that had no group of its own. It stops early if the group is recycled while the iteration is in
/// progress. That happens when the group is emptied, when the map is cleared and when `move_key()`
/// merges the group into the group of a key that already had one.
pub struct GroupIter<'a, K, T: ?Sized> {
    source: Source<'a, K, T>,

    // Held for the lifetime of the iterator when the map serializes iteration.
    _permit: Option<IterationPermit>,
}

enum Source<'a, K, T: ?Sized> {
    Snapshot {
        snapshot: GroupSnapshot<T>,

        /// Entries at and above this index have been visited.
        cursor: usize,
    },
    Live {
        map: &'a ReferenceMap<K, T>,
        id: GroupId,

        /// Generation of the slot when the iteration started. A different generation means the
        /// group was recycled and the iteration is over.
        generation: u64,

        /// Position of the last visited entry. Only consulted if that entry has left the group,
        /// in which case it is clamped to the current group size.
        cursor: usize,

        /// The last visited entry. Entries below it are next, wherever it has moved to.
        last: Option<Arc<Entry<T>>>,
    },
}

impl<'a, K, T: ?Sized> GroupIter<'a, K, T> {
    pub(crate) fn snapshot(snapshot: GroupSnapshot<T>, permit: Option<IterationPermit>) -> Self {
        let cursor = snapshot.entries.len();

        Self {
            source: Source::Snapshot { snapshot, cursor },
            _permit: permit,
        }
    }

    pub(crate) fn live(
        map: &'a ReferenceMap<K, T>,
        id: GroupId,
        generation: u64,
        cursor: usize,
        permit: Option<IterationPermit>,
    ) -> Self {
        Self {
            source: Source::Live {
                map,
                id,
                generation,
                cursor,
                last: None,
            },
            _permit: permit,
        }
    }

    /// Rewinds the iterator to the newest registration.
    ///
    /// A snapshot iterator replays the same snapshot. A live iterator starts over from the
    /// current state of its group, unless the group has been recycled in the meantime.
    pub fn restart(&mut self) {
        match &mut self.source {
            Source::Snapshot { snapshot, cursor } => *cursor = snapshot.entries.len(),
            Source::Live { cursor, last, .. } => {
                *cursor = usize::MAX;
                *last = None;
            }
        }
    }

    /// Whether the iterator walks a snapshot (`true`) or the live group (`false`).
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        matches!(self.source, Source::Snapshot { .. })
    }
}

impl<K, T: ?Sized> Iterator for GroupIter<'_, K, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Snapshot { snapshot, cursor } => loop {
                let index = cursor.checked_sub(1)?;
                *cursor = index;

                if let Some(item) = snapshot.entries.get(index).and_then(|entry| entry.upgrade()) {
                    return Some(item);
                }
            },
            Source::Live {
                map,
                id,
                generation,
                cursor,
                last,
            } => {
                let state = map.lock_state();

                if state.generation(*id) != *generation {
                    *cursor = 0;
                    *last = None;
                    return None;
                }

                let group = state.group(*id);

                let mut index = last
                    .as_ref()
                    .and_then(|entry| group.position_of_entry(entry))
                    .unwrap_or_else(|| (*cursor).min(group.entry_count()));

                loop {
                    let Some(previous) = index.checked_sub(1) else {
                        *cursor = 0;
                        *last = None;
                        return None;
                    };
                    index = previous;

                    let Some(entry) = group.entry(index) else {
                        continue;
                    };

                    if let Some(item) = entry.upgrade() {
                        *cursor = index;
                        *last = Some(Arc::clone(entry));
                        return Some(item);
                    }
                }
            }
        }
    }
}

impl<K, T: ?Sized> FusedIterator for GroupIter<'_, K, T> {}

impl<K, T: ?Sized> fmt::Debug for GroupIter<'_, K, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(type_name::<Self>());

        match &self.source {
            Source::Snapshot { snapshot, cursor } => s
                .field("mode", &"snapshot")
                .field("captured", &snapshot.entries.len())
                .field("cursor", cursor),
            Source::Live { id, cursor, .. } => s
                .field("mode", &"live")
                .field("group", id)
                .field("cursor", cursor),
        };

        s.field("serialized", &self._permit.is_some()).finish()
    }
}

/// Lets one iteration at a time walk a group. A binary semaphore.
#[derive(Debug, Default)]
pub(crate) struct IterationGate {
    busy: Mutex<bool>,
    released: Condvar,
}

impl IterationGate {
    /// Blocks until no other permit for this gate exists.
    pub(crate) fn acquire(self: Arc<Self>) -> IterationPermit {
        let mut busy = self.busy.lock();

        while *busy {
            self.released.wait(&mut busy);
        }

        *busy = true;
        drop(busy);

        IterationPermit { gate: self }
    }
}

/// Proof of exclusive iteration over one group. Releases the gate when dropped.
#[derive(Debug)]
pub(crate) struct IterationPermit {
    gate: Arc<IterationGate>,
}

impl Drop for IterationPermit {
    fn drop(&mut self) {
        *self.gate.busy.lock() = false;
        self.gate.released.notify_one();
    }
}
