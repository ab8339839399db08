use std::any::type_name;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use parking_lot::MutexGuard;

use crate::{GroupId, GroupList, MapState};

/// Exclusive access to the contents of a [`ReferenceMap`][crate::ReferenceMap].
///
/// Returned by [`ReferenceMap::lock()`][crate::ReferenceMap::lock]. Reads through the guard see
/// the groups exactly as stored: references to dropped items are not pruned and nothing is
/// pooled.
pub struct ReferenceMapGuard<'a, K, T: ?Sized> {
    state: MutexGuard<'a, MapState<K, T>>,
}

impl<'a, K, T: ?Sized> ReferenceMapGuard<'a, K, T> {
    pub(crate) fn new(state: MutexGuard<'a, MapState<K, T>>) -> Self {
        Self { state }
    }

    /// The number of keys with a populated group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.index.len()
    }

    /// Whether no key has a populated group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.index.is_empty()
    }

    /// The keys with a populated group, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.state.index.keys()
    }

    /// Every key together with its group, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &GroupList<T>)> {
        self.state
            .index
            .iter()
            .map(|(key, id)| (key, self.state.group(*id)))
    }
}

impl<K, T> ReferenceMapGuard<'_, K, T>
where
    K: Hash + Eq,
    T: ?Sized,
{
    /// The group registered under `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&GroupList<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.index.get(key).map(|id| self.state.group(*id))
    }

    /// The storage slot of the group registered under `key`.
    #[must_use]
    pub fn group_id<Q>(&self, key: &Q) -> Option<GroupId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.index.get(key).copied()
    }
}

impl<K, T: ?Sized> fmt::Debug for ReferenceMapGuard<'_, K, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.state.index.len())
            .finish_non_exhaustive()
    }
}
