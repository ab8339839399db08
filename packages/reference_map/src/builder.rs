use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::sync::Arc;

use crate::{
    DuplicatePolicy, FullnessCounter, FullnessListener, GroupList, GroupOptions, ReferenceMap,
};

/// Builder for creating an instance of [`ReferenceMap`].
///
/// You only need to use this builder if you want to customize the map configuration.
/// The default configuration used by [`ReferenceMap::new()`][1] suits transient listener
/// registration: snapshot iteration, unserialized iteration, full at one reference, duplicates
/// rejected and no fullness listener.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use reference_map::{DuplicatePolicy, ReferenceMap};
///
/// let map = ReferenceMap::<u64, String>::builder()
///     .thread_safe(true)
///     .cache_iterator(false)
///     .fullness_threshold(NonZero::new(4).unwrap())
///     .duplicates(DuplicatePolicy::Allow)
///     .fullness_listener(|_map, is_full| println!("any group full: {is_full}"))
///     .build();
/// ```
///
/// [1]: ReferenceMap::new
#[must_use]
pub struct ReferenceMapBuilder<K, T: ?Sized> {
    thread_safe: bool,
    cache_iterator: bool,
    group_options: GroupOptions,
    listener: Option<Box<dyn FullnessListener<K, T>>>,
}

impl<K, T: ?Sized> fmt::Debug for ReferenceMapBuilder<K, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("thread_safe", &self.thread_safe)
            .field("cache_iterator", &self.cache_iterator)
            .field("group_options", &self.group_options)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl<K, T: ?Sized> ReferenceMapBuilder<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            thread_safe: false,
            cache_iterator: true,
            group_options: GroupOptions::default(),
            listener: None,
        }
    }

    /// Whether iterations over the same group are serialized.
    ///
    /// When enabled, an iterator obtained from [`ReferenceMap::iterator()`] holds a permit
    /// for its group until it is dropped, and iterators over the same group requested on other
    /// threads wait for it. Requesting a second iterator over the same group on the same thread
    /// while the first is alive deadlocks.
    ///
    /// Disabled by default: iterations over the same group may overlap freely.
    pub fn thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// Whether iterators work on a snapshot of the group (`true`, the default) or on its live
    /// state (`false`).
    ///
    /// A snapshot costs one allocation per iteration and is immune to concurrent changes, except
    /// that it skips items removed after it was taken. A live iterator costs nothing up front but
    /// takes the map's lock for every step and observes concurrent changes as they happen.
    pub fn cache_iterator(mut self, cache_iterator: bool) -> Self {
        self.cache_iterator = cache_iterator;
        self
    }

    /// The number of live references at which a group counts as full. Defaults to 1.
    pub fn fullness_threshold(mut self, threshold: NonZero<usize>) -> Self {
        self.group_options.threshold = threshold;
        self
    }

    /// How groups treat repeated registrations of the same item.
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.group_options.duplicates = policy;
        self
    }

    /// Sets the listener that hears about changes in aggregate fullness.
    ///
    /// See [`FullnessListener`] for the delivery guarantees.
    pub fn fullness_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ReferenceMap<K, T>, bool) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Sets a listener type of your own as the fullness listener.
    ///
    /// Same as [`fullness_listener()`][Self::fullness_listener] but for types that implement
    /// [`FullnessListener`] directly instead of being closures.
    pub fn fullness_listener_impl(mut self, listener: impl FullnessListener<K, T> + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Builds the map with the specified configuration.
    #[must_use]
    pub fn build(self) -> ReferenceMap<K, T> {
        ReferenceMap::new_inner(
            self.thread_safe,
            self.cache_iterator,
            self.group_options,
            self.listener,
        )
    }
}

/// Builder for creating a standalone [`GroupList`].
///
/// Groups owned by a [`ReferenceMap`] are configured through [`ReferenceMapBuilder`] instead.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
/// use std::sync::Arc;
///
/// use reference_map::{FullnessCounter, GroupList};
///
/// let counter = Arc::new(FullnessCounter::new());
///
/// let group = GroupList::<String>::builder()
///     .threshold(NonZero::new(2).unwrap())
///     .fullness_counter(Arc::clone(&counter))
///     .build();
/// ```
#[must_use]
pub struct GroupListBuilder<T: ?Sized> {
    options: GroupOptions,
    counter: Option<Arc<FullnessCounter>>,

    _item: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> fmt::Debug for GroupListBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("options", &self.options)
            .field("counter", &self.counter)
            .finish()
    }
}

impl<T: ?Sized> GroupListBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            options: GroupOptions::default(),
            counter: None,
            _item: PhantomData,
        }
    }

    /// The number of live references at which the group counts as full. Defaults to 1.
    pub fn threshold(mut self, threshold: NonZero<usize>) -> Self {
        self.options.threshold = threshold;
        self
    }

    /// How the group treats repeated registrations of the same item.
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.options.duplicates = policy;
        self
    }

    /// Connects the group to a counter that hears about every change of its fullness.
    pub fn fullness_counter(mut self, counter: Arc<FullnessCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Builds the group with the specified configuration.
    #[must_use]
    pub fn build(self) -> GroupList<T> {
        GroupList::from_options(self.options, self.counter)
    }
}
