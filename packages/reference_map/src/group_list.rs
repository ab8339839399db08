use std::any::type_name;
use std::iter::{FusedIterator, Rev};
use std::num::NonZero;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::{fmt, mem, ptr, slice};

use tracing::trace;

use crate::{DuplicatePolicy, FullnessCounter, GroupListBuilder};

/// The references registered under one key.
///
/// A group holds non-owning references to items owned by the host. The host keeps each item
/// alive through its own `Arc<T>` and removes it from the group before letting it go. References
/// whose item has been dropped anyway are pruned the next time the group is modified.
///
/// Items are compared by identity, never by value. Iteration yields the newest registration
/// first.
///
/// # Fullness
///
/// A group is full while it holds at least [`threshold()`][Self::threshold] live references.
/// When a group is connected to a [`FullnessCounter`], every change of its fullness is reported
/// to the counter exactly once.
///
/// # Synchronization
///
/// A group has no lock of its own. All mutation goes through `&mut self`, so sharing a group
/// between threads requires an external lock, which the compiler enforces. [`ReferenceMap`]
/// provides that lock for the groups it owns.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use reference_map::GroupList;
///
/// let mut group = GroupList::<str>::new();
///
/// let first: Arc<str> = Arc::from("first");
/// let second: Arc<str> = Arc::from("second");
///
/// assert!(group.add(&first));
/// assert!(!group.add(&second));
///
/// let seen = group.iter().map(|s| s.to_string()).collect::<Vec<_>>();
/// assert_eq!(seen, ["second", "first"]);
///
/// assert!(group.remove(&*first));
/// assert_eq!(group.len(), 1);
/// ```
///
/// [`ReferenceMap`]: crate::ReferenceMap
pub struct GroupList<T: ?Sized> {
    /// Oldest first. May contain entries whose item has been dropped, until pruned.
    entries: Vec<Arc<Entry<T>>>,

    threshold: NonZero<usize>,
    duplicates: DuplicatePolicy,

    /// Last fullness state reported to the counter (or that would have been reported, if there
    /// is no counter).
    is_full: bool,

    counter: Option<Arc<FullnessCounter>>,
}

/// One registration of an item in a group.
///
/// Entries are shared with snapshots, which lets a snapshot notice that an entry was removed
/// from its group after the snapshot was taken.
pub(crate) struct Entry<T: ?Sized> {
    item: Weak<T>,
    removed: AtomicBool,
}

impl<T: ?Sized> Entry<T> {
    fn new(item: &Arc<T>) -> Self {
        Self {
            item: Arc::downgrade(item),
            removed: AtomicBool::new(false),
        }
    }

    fn refers_to(&self, item: *const T) -> bool {
        ptr::addr_eq(self.item.as_ptr(), item)
    }

    fn is_alive(&self) -> bool {
        self.item.strong_count() > 0
    }

    fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// The item, unless the entry was removed from its group or the item was dropped.
    pub(crate) fn upgrade(&self) -> Option<Arc<T>> {
        if self.removed.load(Ordering::Acquire) {
            return None;
        }

        self.item.upgrade()
    }
}

/// How groups are configured. Shared by every group a map creates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct GroupOptions {
    pub(crate) threshold: NonZero<usize>,
    pub(crate) duplicates: DuplicatePolicy,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            threshold: NonZero::<usize>::MIN,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl<T: ?Sized> GroupList<T> {
    /// Creates an empty group that is full at one reference, rejects duplicates and reports
    /// fullness changes to nobody.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a group with a custom configuration.
    pub fn builder() -> GroupListBuilder<T> {
        GroupListBuilder::new()
    }

    pub(crate) fn from_options(
        options: GroupOptions,
        counter: Option<Arc<FullnessCounter>>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            threshold: options.threshold,
            duplicates: options.duplicates,
            is_full: false,
            counter,
        }
    }

    /// Registers `item` in the group.
    ///
    /// Returns `true` if the group was empty before this call, which tells the caller that the
    /// group has just been populated (or repopulated). Under [`DuplicatePolicy::Reject`], adding
    /// an item that is already registered changes nothing.
    pub fn add(&mut self, item: &Arc<T>) -> bool {
        self.prune_dead();

        let was_empty = self.entries.is_empty();

        let accept = match self.duplicates {
            DuplicatePolicy::Reject => self.position_of(Arc::as_ptr(item)).is_none(),
            DuplicatePolicy::Allow => true,
        };

        if accept {
            self.entries.push(Arc::new(Entry::new(item)));
        }

        self.evaluate_fullness();

        was_empty
    }

    /// Removes the newest registration of `item`, comparing by identity.
    ///
    /// Returns whether a registration was found. The group may be empty afterwards; callers
    /// that own the group decide what to do with it.
    pub fn remove(&mut self, item: &T) -> bool {
        let removed = match self.position_of(ptr::from_ref(item)) {
            Some(index) => {
                self.entries.remove(index).mark_removed();
                true
            }
            None => false,
        };

        self.prune_dead();
        self.evaluate_fullness();

        removed
    }

    /// Moves every registration of `other` into this group, leaving `other` empty.
    ///
    /// Registrations that would be duplicates here are dropped under
    /// [`DuplicatePolicy::Reject`]. Fullness is evaluated once for each group after the whole
    /// transfer, not once per item, and this group is evaluated first so that an aggregate
    /// counter never sees a spurious "nothing is full" moment.
    ///
    /// Returns the number of registrations this group gained.
    pub fn add_all(&mut self, other: &mut Self) -> usize {
        self.prune_dead();

        let mut added: usize = 0;

        for entry in mem::take(&mut other.entries) {
            let duplicate = self.duplicates == DuplicatePolicy::Reject
                && self.position_of(entry.item.as_ptr()).is_some();

            if duplicate || !entry.is_alive() {
                entry.mark_removed();
                continue;
            }

            self.entries.push(entry);
            added = added
                .checked_add(1)
                .expect("a group cannot hold more entries than addressable memory");
        }

        self.evaluate_fullness();
        other.evaluate_fullness();

        added
    }

    /// Removes every registration.
    ///
    /// Individual removals are not reported. If the group was full, the counter hears about it
    /// exactly once.
    pub fn clear(&mut self) {
        self.discard_entries();
        self.evaluate_fullness();
    }

    /// Removes every registration without reporting anything to the counter.
    ///
    /// Returns whether the group was counted as full, so the owner can settle the counter in bulk.
    pub(crate) fn reset(&mut self) -> bool {
        self.discard_entries();
        mem::replace(&mut self.is_full, false)
    }

    /// Drops references to items that no longer exist.
    ///
    /// Returns whether the group is empty afterwards.
    pub(crate) fn prune(&mut self) -> bool {
        self.prune_dead();
        self.evaluate_fullness();
        self.entries.is_empty()
    }

    /// The number of registrations whose item still exists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_alive()).count()
    }

    /// Whether the group has no registration whose item still exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(|entry| entry.is_alive())
    }

    /// Whether the group was full as of its last modification.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// The number of live references at which the group counts as full.
    #[must_use]
    pub fn threshold(&self) -> NonZero<usize> {
        self.threshold
    }

    /// How the group treats repeated registrations of the same item.
    #[must_use]
    pub fn duplicates(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Whether `item` is registered in the group, comparing by identity.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.position_of(ptr::from_ref(item))
            .and_then(|index| self.entries.get(index))
            .is_some_and(|entry| entry.is_alive())
    }

    /// Iterates over the items of the group, newest registration first.
    ///
    /// Items that have been dropped by their owner are skipped.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.entries.iter().rev(),
        }
    }

    /// Captures the current registrations.
    ///
    /// The snapshot can be iterated any number of times while the group keeps changing. Items
    /// added to the group after the snapshot was taken are not part of it, and items removed
    /// from the group after the snapshot was taken are skipped by it.
    #[must_use]
    pub fn snapshot(&self) -> GroupSnapshot<T> {
        GroupSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// Number of stored entries, including any that have not been pruned yet.
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry(&self, index: usize) -> Option<&Arc<Entry<T>>> {
        self.entries.get(index)
    }

    /// Where `entry` currently sits, if it is still part of the group.
    pub(crate) fn position_of_entry(&self, entry: &Arc<Entry<T>>) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|candidate| Arc::ptr_eq(candidate, entry))
    }

    fn position_of(&self, item: *const T) -> Option<usize> {
        self.entries.iter().rposition(|entry| entry.refers_to(item))
    }

    fn prune_dead(&mut self) {
        let before = self.entries.len();

        self.entries.retain(|entry| {
            let alive = entry.is_alive();

            if !alive {
                entry.mark_removed();
            }

            alive
        });

        if self.entries.len() != before {
            trace!(
                pruned = before.saturating_sub(self.entries.len()),
                "pruned references to dropped items"
            );
        }
    }

    fn discard_entries(&mut self) {
        for entry in self.entries.drain(..) {
            entry.mark_removed();
        }
    }

    fn evaluate_fullness(&mut self) {
        let is_full = self.entries.len() >= self.threshold.get();

        if is_full == self.is_full {
            return;
        }

        self.is_full = is_full;

        if let Some(counter) = &self.counter {
            counter.signal(is_full);
        }
    }
}

impl<T: ?Sized> Default for GroupList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for GroupList<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("entries", &self.entries.len())
            .field("threshold", &self.threshold)
            .field("duplicates", &self.duplicates)
            .field("is_full", &self.is_full)
            .field("has_counter", &self.counter.is_some())
            .finish()
    }
}

impl<'a, T: ?Sized> IntoIterator for &'a GroupList<T> {
    type Item = Arc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the live items of a [`GroupList`], newest registration first.
pub struct Iter<'a, T: ?Sized> {
    inner: Rev<slice::Iter<'a, Arc<Entry<T>>>>,
}

impl<T: ?Sized> Iterator for Iter<'_, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(|entry| entry.upgrade())
    }
}

impl<T: ?Sized> FusedIterator for Iter<'_, T> {}

impl<T: ?Sized> fmt::Debug for Iter<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("remaining_entries", &self.inner.len())
            .finish()
    }
}

/// The registrations of a [`GroupList`] at one moment in time.
///
/// See [`GroupList::snapshot()`].
pub struct GroupSnapshot<T: ?Sized> {
    /// Oldest first, same as in the group.
    pub(crate) entries: Vec<Arc<Entry<T>>>,
}

impl<T: ?Sized> GroupSnapshot<T> {
    /// Iterates over the captured items that are still registered and still exist, newest
    /// registration first. May be called any number of times.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.entries.iter().rev(),
        }
    }

    /// The number of registrations captured, including ones removed since.
    #[must_use]
    pub fn captured(&self) -> usize {
        self.entries.len()
    }
}

impl<'a, T: ?Sized> IntoIterator for &'a GroupSnapshot<T> {
    type Item = Arc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ?Sized> fmt::Debug for GroupSnapshot<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("captured", &self.entries.len())
            .finish()
    }
}
