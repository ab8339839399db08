use std::any::type_name;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::{fmt, mem};

use foldhash::HashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::metrics::{GROUPS_ALLOCATED, GROUPS_RECYCLED, GROUPS_REUSED};
use crate::{
    FullnessCounter, FullnessListener, GroupIter, GroupList, GroupOptions, IterationGate,
    ReferenceMapBuilder, ReferenceMapGuard,
};

/// A thread-safe multimap from keys to groups of non-owning item references.
///
/// The map is meant for listener registries: the host owns each listener through an `Arc<T>`,
/// registers it under one or more keys and later removes it again. The map itself never keeps
/// an item alive. References to items the host dropped without removing them are pruned the next
/// time their group is touched.
///
/// Items are compared by identity (the address of the shared allocation). `T` may be unsized,
/// so `dyn Trait` listeners work.
///
/// # Groups and pooling
///
/// Each key owns one [`GroupList`]. A group is created on the first add under a key and
/// returned to an internal pool once it becomes empty, at which point the key disappears from
/// the map. The next key that needs a group gets a pooled one back. Group memory is therefore
/// bounded by the peak number of simultaneously populated keys.
///
/// # Fullness
///
/// Each group is full while it holds at least the configured threshold of references (one by
/// default). The map is full while any group is full. An optional [`FullnessListener`] hears
/// about every change of the map's fullness, exactly once and in order, with no lock held.
///
/// # Thread safety
///
/// Every operation takes `&self` and is serialized by one internal lock. Iterators either walk a
/// snapshot or lock the map for each step, depending on how the map was built. See
/// [`ReferenceMapBuilder`] for the options.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use reference_map::ReferenceMap;
///
/// let map = ReferenceMap::<&str, String>::new();
///
/// let first = Arc::new("first".to_string());
/// let second = Arc::new("second".to_string());
///
/// assert!(map.add("click", &first));
/// assert!(!map.add("click", &second));
///
/// let order = map
///     .iterator("click")
///     .unwrap()
///     .map(|s| (*s).clone())
///     .collect::<Vec<_>>();
/// assert_eq!(order, ["second", "first"]);
///
/// map.remove("click", &*first);
/// map.remove("click", &*second);
/// assert!(!map.has("click"));
/// ```
pub struct ReferenceMap<K, T: ?Sized> {
    state: Mutex<MapState<K, T>>,

    counter: Arc<FullnessCounter>,
    listener: Option<Box<dyn FullnessListener<K, T>>>,

    group_options: GroupOptions,
    thread_safe: bool,
    cache_iterator: bool,
}

/// Identifies the storage slot of a group inside a [`ReferenceMap`].
///
/// Slots are reused: once a group is emptied and pooled, a later key may be handed the same slot.
/// Comparing the identifier a key had earlier with the one it has now tells whether a pooled
/// group was reused.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GroupId {
    index: usize,
}

impl GroupId {
    /// The position of the slot in the map's storage.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

pub(crate) struct MapState<K, T: ?Sized> {
    pub(crate) index: HashMap<K, GroupId>,

    slots: Vec<Slot<T>>,

    /// Most recently pooled slot, or `None` if the pool is empty.
    free_head: Option<GroupId>,
    pooled: usize,
}

struct Slot<T: ?Sized> {
    group: GroupList<T>,
    link: Link,

    /// Incremented every time the slot is pooled, so a live iterator can tell that the group it
    /// was walking no longer exists.
    generation: u64,

    iteration_gate: Arc<IterationGate>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Link {
    Active,
    Pooled { next_free: Option<GroupId> },
}

impl<K, T: ?Sized> MapState<K, T> {
    fn new() -> Self {
        Self {
            index: HashMap::default(),
            slots: Vec::new(),
            free_head: None,
            pooled: 0,
        }
    }

    fn slot(&self, id: GroupId) -> &Slot<T> {
        self.slots
            .get(id.index)
            .expect("group IDs are only handed out for slots that exist")
    }

    fn slot_mut(&mut self, id: GroupId) -> &mut Slot<T> {
        self.slots
            .get_mut(id.index)
            .expect("group IDs are only handed out for slots that exist")
    }

    pub(crate) fn group(&self, id: GroupId) -> &GroupList<T> {
        &self.slot(id).group
    }

    fn group_mut(&mut self, id: GroupId) -> &mut GroupList<T> {
        &mut self.slot_mut(id).group
    }

    pub(crate) fn generation(&self, id: GroupId) -> u64 {
        self.slot(id).generation
    }

    fn iteration_gate(&self, id: GroupId) -> &Arc<IterationGate> {
        &self.slot(id).iteration_gate
    }

    /// Takes a group from the pool, or creates one if the pool is empty.
    fn acquire(&mut self, options: GroupOptions, counter: &Arc<FullnessCounter>) -> GroupId {
        if let Some(id) = self.free_head {
            let slot = self.slot_mut(id);

            let Link::Pooled { next_free } = slot.link else {
                panic!("pool head {id:?} refers to an active group");
            };

            slot.link = Link::Active;
            self.free_head = next_free;
            self.pooled = self
                .pooled
                .checked_sub(1)
                .expect("a pooled slot was taken so the pool cannot have been empty");

            GROUPS_REUSED.with(|e| e.observe_once());
            trace!(slot = id.index, "reusing pooled group");

            return id;
        }

        let id = GroupId {
            index: self.slots.len(),
        };

        self.slots.push(Slot {
            group: GroupList::from_options(options, Some(Arc::clone(counter))),
            link: Link::Active,
            generation: 0,
            iteration_gate: Arc::new(IterationGate::default()),
        });

        GROUPS_ALLOCATED.with(|e| e.observe_once());
        trace!(slot = id.index, "allocated new group");

        id
    }

    /// Returns an emptied group to the pool. The caller has already removed its key.
    fn recycle(&mut self, id: GroupId) {
        let next_free = self.free_head;
        let slot = self.slot_mut(id);

        assert_eq!(
            slot.link,
            Link::Active,
            "group {id:?} was recycled while already pooled"
        );
        debug_assert_eq!(slot.group.entry_count(), 0);
        debug_assert!(!slot.group.is_full());

        slot.link = Link::Pooled { next_free };
        slot.generation = slot.generation.wrapping_add(1);

        self.free_head = Some(id);
        self.pooled = self
            .pooled
            .checked_add(1)
            .expect("cannot pool more groups than exist");

        GROUPS_RECYCLED.with(|e| e.observe_once());
        trace!(slot = id.index, "returned group to pool");
    }

    fn two_groups_mut(
        &mut self,
        first: GroupId,
        second: GroupId,
    ) -> (&mut GroupList<T>, &mut GroupList<T>) {
        let [first, second] = self
            .slots
            .get_disjoint_mut([first.index, second.index])
            .expect("two distinct keys never share a group");

        (&mut first.group, &mut second.group)
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut seen_pooled = vec![false; self.slots.len()];
        let mut pooled: usize = 0;
        let mut cursor = self.free_head;

        while let Some(id) = cursor {
            assert!(
                !seen_pooled[id.index],
                "pool contains a cycle through slot {}",
                id.index
            );
            seen_pooled[id.index] = true;
            pooled += 1;

            let slot = self.slot(id);
            let Link::Pooled { next_free } = slot.link else {
                panic!("pool contains active slot {}", id.index);
            };

            assert_eq!(slot.group.entry_count(), 0, "pooled group is not empty");
            assert!(!slot.group.is_full(), "pooled group is counted as full");

            cursor = next_free;
        }

        assert_eq!(pooled, self.pooled);

        for id in self.index.values() {
            assert!(!seen_pooled[id.index], "key refers to pooled slot {}", id.index);
            assert_eq!(self.slot(*id).link, Link::Active);
            assert!(
                self.slot(*id).group.entry_count() > 0,
                "key refers to empty group"
            );
        }

        assert_eq!(self.index.len() + self.pooled, self.slots.len());
    }
}

impl<K, T: ?Sized> ReferenceMap<K, T> {
    /// Creates a map with the default configuration.
    ///
    /// See [`ReferenceMapBuilder`] for what the defaults are and how to change them.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a map with a custom configuration.
    pub fn builder() -> ReferenceMapBuilder<K, T> {
        ReferenceMapBuilder::new()
    }

    pub(crate) fn new_inner(
        thread_safe: bool,
        cache_iterator: bool,
        group_options: GroupOptions,
        listener: Option<Box<dyn FullnessListener<K, T>>>,
    ) -> Self {
        Self {
            state: Mutex::new(MapState::new()),
            counter: Arc::new(FullnessCounter::new()),
            listener,
            group_options,
            thread_safe,
            cache_iterator,
        }
    }

    /// Whether any group is currently full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.counter.is_full()
    }

    /// The number of groups currently full.
    #[must_use]
    pub fn full_groups(&self) -> usize {
        self.counter.full_groups()
    }

    /// The number of keys with a populated group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    /// Whether no key has a populated group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    /// The number of groups the map has ever created, active and pooled together.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// The number of empty groups waiting in the pool for reuse.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.state.lock().pooled
    }

    /// Locks the map for direct inspection.
    ///
    /// No other operation on the map can proceed while the guard exists, including operations
    /// from fullness listeners, so keep the guard short-lived. Calling any method of the map on
    /// the same thread while holding the guard deadlocks.
    pub fn lock(&self) -> ReferenceMapGuard<'_, K, T> {
        ReferenceMapGuard::new(self.state.lock())
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, MapState<K, T>> {
        self.state.lock()
    }

    fn deliver_fullness(&self) {
        match &self.listener {
            Some(listener) => self
                .counter
                .deliver(|is_full| listener.on_fullness_changed(self, is_full)),
            None => self.counter.deliver(|_| {}),
        }
    }
}

impl<K, T> ReferenceMap<K, T>
where
    K: Hash + Eq,
    T: ?Sized,
{
    /// Registers `item` under `key`.
    ///
    /// Returns `true` if `key` had no populated group before this call. This is the signal to
    /// start whatever upstream subscription the key stands for.
    pub fn add(&self, key: K, item: &Arc<T>) -> bool {
        let was_empty = {
            let mut state = self.state.lock();

            let existing = state.index.get(&key).copied();

            let id = match existing {
                Some(id) => id,
                None => {
                    let id = state.acquire(self.group_options, &self.counter);
                    state.index.insert(key, id);
                    id
                }
            };

            state.group_mut(id).add(item)
        };

        self.deliver_fullness();

        was_empty
    }

    /// Whether `key` has at least one live registration.
    ///
    /// References to dropped items are pruned first. If nothing is left, the key is removed and
    /// its group pooled, so this may deliver a fullness change.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let present = {
            let mut state = self.state.lock();

            match state.index.get(key).copied() {
                Some(id) => {
                    if state.group_mut(id).prune() {
                        debug!("key has only dropped items left, pooling its group");
                        state.index.remove(key);
                        state.recycle(id);
                        false
                    } else {
                        true
                    }
                }
                None => false,
            }
        };

        self.deliver_fullness();

        present
    }

    /// Removes one registration of `item` from `key`, comparing items by identity.
    ///
    /// If the group is left empty, the key is removed and the group returns to the pool. Removing
    /// an item that is not registered only prunes dropped items.
    pub fn remove<Q>(&self, key: &Q, item: &T)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        {
            let mut state = self.state.lock();

            let Some(id) = state.index.get(key).copied() else {
                return;
            };

            let group = state.group_mut(id);
            group.remove(item);

            if group.entry_count() == 0 {
                group.clear();
                state.index.remove(key);
                state.recycle(id);
            }
        }

        self.deliver_fullness();
    }

    /// Moves every registration under `old_key` to `new_key`.
    ///
    /// If `new_key` already has a group, the registrations are merged into it and the group of
    /// `old_key` is pooled. Otherwise the group of `old_key` simply changes its key. Nothing
    /// happens if `old_key` has no group.
    pub fn move_key<Q>(&self, old_key: &Q, new_key: K)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        {
            let mut state = self.state.lock();

            let Some(old_id) = state.index.remove(old_key) else {
                return;
            };

            if let Some(new_id) = state.index.get::<K>(&new_key).copied() {
                let (target, source) = state.two_groups_mut(new_id, old_id);
                let merged = target.add_all(source);

                trace!(
                    from = old_id.index,
                    to = new_id.index,
                    merged,
                    "merged group into existing key"
                );

                state.recycle(old_id);
            } else {
                state.index.insert(new_key, old_id);
            }
        }

        self.deliver_fullness();
    }

    /// Removes every key and pools every group.
    ///
    /// Individual removals are not reported. If the map was full, the fullness listener is told
    /// once that it no longer is. Clearing an empty map does nothing.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock();
            let mut released: usize = 0;

            for id in mem::take(&mut state.index).into_values() {
                if state.group_mut(id).reset() {
                    released = released
                        .checked_add(1)
                        .expect("cannot have more full groups than groups");
                }

                state.recycle(id);
            }

            debug!(released, "cleared reference map");

            self.counter.release(released);
        }

        self.deliver_fullness();
    }

    /// Returns an iterator over the items registered under `key`, newest registration first,
    /// or `None` if `key` has no group.
    ///
    /// If the map was built with [`thread_safe(true)`][ReferenceMapBuilder::thread_safe], this
    /// waits until no other iterator over the same group exists and the returned iterator
    /// blocks others until it is dropped.
    pub fn iterator<Q>(&self, key: &Q) -> Option<GroupIter<'_, K, T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();

        let (id, permit) = if self.thread_safe {
            loop {
                let id = *state.index.get(key)?;
                let gate = Arc::clone(state.iteration_gate(id));

                // Another iteration over the same group may need the map lock to finish.
                let permit = MutexGuard::unlocked(&mut state, || gate.acquire());

                // The group may have moved away or been pooled while we waited.
                if state.index.get(key) == Some(&id) {
                    break (id, Some(permit));
                }
            }
        } else {
            (*state.index.get(key)?, None)
        };

        if self.cache_iterator {
            let snapshot = state.group(id).snapshot();
            drop(state);

            Some(GroupIter::snapshot(snapshot, permit))
        } else {
            let generation = state.generation(id);
            let cursor = state.group(id).entry_count();
            drop(state);

            Some(GroupIter::live(self, id, generation, cursor, permit))
        }
    }
}

impl<K, T: ?Sized> Default for ReferenceMap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T: ?Sized> fmt::Debug for ReferenceMap<K, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("counter", &self.counter)
            .field("has_listener", &self.listener.is_some())
            .field("group_options", &self.group_options)
            .field("thread_safe", &self.thread_safe)
            .field("cache_iterator", &self.cache_iterator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::num::NonZero;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::DuplicatePolicy;

    assert_impl_all!(ReferenceMap<u32, String>: Send, Sync);
    assert_impl_all!(ReferenceMap<u32, dyn Fn() + Send + Sync>: Send, Sync);
    assert_not_impl_any!(ReferenceMap<u32, Cell<u32>>: Sync);

    fn item(name: &str) -> Arc<String> {
        Arc::new(name.to_string())
    }

    fn names(map: &ReferenceMap<&'static str, String>, key: &str) -> Vec<String> {
        map.iterator(key)
            .map(|iter| iter.map(|s| (*s).clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn add_reports_first_population_per_key() {
        let map = ReferenceMap::new();
        let a = item("a");
        let b = item("b");

        assert!(map.add("x", &a));
        assert!(!map.add("x", &b));
        assert!(map.add("y", &a));

        assert_eq!(map.len(), 2);
        map.lock_state().integrity_check();
    }

    #[test]
    fn emptied_group_is_pooled_and_reused() {
        let map = ReferenceMap::new();
        let a = item("a");

        map.add("x", &a);
        let first_id = map.lock().group_id("x").unwrap();

        map.remove("x", &*a);
        assert!(!map.has("x"));
        assert_eq!(map.pooled(), 1);
        assert_eq!(map.capacity(), 1);
        map.lock_state().integrity_check();

        map.add("y", &a);
        assert_eq!(map.lock().group_id("y"), Some(first_id));
        assert_eq!(map.pooled(), 0);
        assert_eq!(map.capacity(), 1);
        map.lock_state().integrity_check();
    }

    #[test]
    fn pool_is_last_in_first_out() {
        let map = ReferenceMap::new();
        let a = item("a");

        map.add("x", &a);
        map.add("y", &a);
        let y_id = map.lock().group_id("y").unwrap();

        map.remove("x", &*a);
        map.remove("y", &*a);
        assert_eq!(map.pooled(), 2);

        map.add("z", &a);
        assert_eq!(map.lock().group_id("z"), Some(y_id));
        map.lock_state().integrity_check();
    }

    #[test]
    fn has_prunes_dropped_items_and_pools_group() {
        let map = ReferenceMap::new();
        let a = item("a");

        map.add("x", &a);
        drop(a);

        assert!(!map.has("x"));
        assert!(map.is_empty());
        assert_eq!(map.pooled(), 1);
        assert!(!map.is_full());
        map.lock_state().integrity_check();
    }

    #[test]
    fn removing_unknown_item_keeps_group() {
        let map = ReferenceMap::new();
        let a = item("a");
        let stranger = item("a");

        map.add("x", &a);
        map.remove("x", &*stranger);
        map.remove("missing", &*a);

        assert!(map.has("x"));
        assert_eq!(map.pooled(), 0);
    }

    #[test]
    fn move_key_rekeys_when_target_absent() {
        let map = ReferenceMap::new();
        let a = item("a");

        map.add("old", &a);
        let id = map.lock().group_id("old").unwrap();

        map.move_key("old", "new");

        assert!(!map.has("old"));
        assert!(map.has("new"));
        assert_eq!(map.lock().group_id("new"), Some(id));
        assert_eq!(map.pooled(), 0);
        map.lock_state().integrity_check();
    }

    #[test]
    fn move_key_merges_when_target_present() {
        let map = ReferenceMap::new();
        let a = item("a");
        let b = item("b");

        map.add("old", &a);
        map.add("new", &b);

        map.move_key("old", "new");

        assert!(!map.has("old"));
        assert_eq!(names(&map, "new"), ["a", "b"]);
        assert_eq!(map.pooled(), 1);
        map.lock_state().integrity_check();
    }

    #[test]
    fn move_key_of_missing_key_is_noop() {
        let map = ReferenceMap::<&str, String>::new();

        map.move_key("old", "new");

        assert!(map.is_empty());
        assert_eq!(map.capacity(), 0);
    }

    #[test]
    fn clear_pools_everything_and_is_idempotent() {
        let edges = Arc::new(Mutex::new(Vec::new()));
        let map = ReferenceMap::<&str, String>::builder()
            .fullness_listener({
                let edges = Arc::clone(&edges);
                move |_map, is_full| edges.lock().push(is_full)
            })
            .build();

        let a = item("a");
        let b = item("b");
        map.add("x", &a);
        map.add("y", &b);

        map.clear();
        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.pooled(), 2);
        assert_eq!(map.full_groups(), 0);
        assert_eq!(*edges.lock(), [true, false]);
        map.lock_state().integrity_check();
    }

    #[test]
    fn threshold_applies_to_every_group() {
        let map = ReferenceMap::<&str, String>::builder()
            .fullness_threshold(NonZero::new(2).unwrap())
            .build();
        let a = item("a");
        let b = item("b");

        map.add("x", &a);
        assert!(!map.is_full());

        map.add("x", &b);
        assert!(map.is_full());

        map.add("y", &a);
        map.add("y", &b);
        assert_eq!(map.full_groups(), 2);
    }

    #[test]
    fn duplicates_policy_applies_to_every_group() {
        let map = ReferenceMap::<&str, String>::builder()
            .duplicates(DuplicatePolicy::Allow)
            .build();
        let a = item("a");

        map.add("x", &a);
        map.add("x", &a);

        assert_eq!(names(&map, "x"), ["a", "a"]);
    }

    #[test]
    fn listener_may_reenter_map() {
        let seen = Arc::new(AtomicUsize::new(0));
        let keeper = item("keeper");

        let map = ReferenceMap::<&str, String>::builder()
            .fullness_listener({
                let seen = Arc::clone(&seen);
                let keeper = Arc::clone(&keeper);

                move |map, is_full| {
                    seen.fetch_add(1, Ordering::SeqCst);

                    // Adding under a second key while already full causes no further edge.
                    if is_full {
                        map.add("side", &keeper);
                    }
                }
            })
            .build();

        let a = item("a");
        map.add("x", &a);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(map.has("side"));
        assert_eq!(map.full_groups(), 2);
    }

    #[test]
    fn live_iterator_sees_concurrent_changes() {
        let map = ReferenceMap::<&str, String>::builder()
            .cache_iterator(false)
            .build();
        let a = item("a");
        let b = item("b");
        let c = item("c");

        map.add("x", &a);
        map.add("x", &b);

        let mut iter = map.iterator("x").unwrap();
        assert!(!iter.is_snapshot());
        assert_eq!(*iter.next().unwrap(), "b");

        map.remove("x", &*a);
        assert!(iter.next().is_none());

        map.add("x", &c);
        iter.restart();
        let seen = iter.map(|s| (*s).clone()).collect::<Vec<_>>();
        assert_eq!(seen, ["c", "b"]);
    }

    #[test]
    fn live_iterator_stops_when_group_is_pooled() {
        let map = ReferenceMap::<&str, String>::builder()
            .cache_iterator(false)
            .build();
        let a = item("a");
        let b = item("b");

        map.add("x", &a);

        let mut iter = map.iterator("x").unwrap();
        map.remove("x", &*a);

        // The same slot is now serving another key.
        map.add("y", &b);

        assert!(iter.next().is_none());
        iter.restart();
        assert!(iter.next().is_none());
    }

    #[test]
    fn snapshot_iterator_restarts_on_same_snapshot() {
        let map = ReferenceMap::new();
        let a = item("a");
        let b = item("b");

        map.add("x", &a);

        let mut iter = map.iterator("x").unwrap();
        assert!(iter.is_snapshot());
        map.add("x", &b);

        assert_eq!(iter.by_ref().count(), 1);
        iter.restart();
        assert_eq!(iter.count(), 1);
    }

    #[test]
    fn serialized_iterators_release_on_drop() {
        let map = ReferenceMap::<&str, String>::builder()
            .thread_safe(true)
            .build();
        let a = item("a");

        map.add("x", &a);

        let first = map.iterator("x").unwrap();
        drop(first);

        // Would deadlock if the first permit were still held.
        let second = map.iterator("x").unwrap();
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn iterator_for_missing_key_is_none() {
        let map = ReferenceMap::<&str, String>::builder()
            .thread_safe(true)
            .build();

        assert!(map.iterator("x").is_none());
    }
}
