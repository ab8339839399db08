/// The order in which a [`GatedJobQueue`][crate::GatedJobQueue] runs the jobs of its backlog.
///
/// The queue has two drain paths with separately configurable orders: the one taken by
/// [`add()`][1] when it finds the gate open and the one taken by [`trigger()`][2].
/// By default `trigger()` runs the backlog oldest first while `add()` runs it newest first.
///
/// [1]: crate::GatedJobQueue::add
/// [2]: crate::GatedJobQueue::trigger
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DrainOrder {
    /// Jobs run in the order they were added.
    #[default]
    OldestFirst,

    /// The most recently added job runs first.
    NewestFirst,
}
