use std::any::type_name;
use std::fmt;

use crate::{DrainOrder, GatedJobQueue, Gate};

pub(crate) type Observer = Box<dyn Fn() + Send + Sync>;

/// Builder for creating an instance of [`GatedJobQueue`].
///
/// You only need to use this builder if you want observers or a custom drain order. Otherwise,
/// [`GatedJobQueue::new()`] is enough.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use gated_queue::{DrainOrder, GatedJobQueue};
///
/// let waiting = Arc::new(AtomicUsize::new(0));
///
/// let queue = GatedJobQueue::builder(|| false)
///     .on_add({
///         let waiting = Arc::clone(&waiting);
///         move || {
///             waiting.fetch_add(1, Ordering::Relaxed);
///         }
///     })
///     .on_remove({
///         let waiting = Arc::clone(&waiting);
///         move || {
///             waiting.fetch_sub(1, Ordering::Relaxed);
///         }
///     })
///     .add_drain_order(DrainOrder::OldestFirst)
///     .build();
///
/// queue.add(|| println!("eventually"));
/// assert_eq!(waiting.load(Ordering::Relaxed), 1);
/// ```
#[must_use]
pub struct GatedJobQueueBuilder {
    gate: Box<dyn Gate>,
    on_add: Option<Observer>,
    on_remove: Option<Observer>,
    add_drain_order: DrainOrder,
    trigger_drain_order: DrainOrder,
}

impl fmt::Debug for GatedJobQueueBuilder {
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

impl GatedJobQueueBuilder {
    pub(crate) fn new(gate: impl Gate) -> Self {
        Self {
            gate: Box::new(gate),
            on_add: None,
            on_remove: None,
            add_drain_order: DrainOrder::NewestFirst,
            trigger_drain_order: DrainOrder::OldestFirst,
        }
    }

    /// Called once for every job that is put in the backlog instead of running immediately.
    pub fn on_add(mut self, observer: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_add = Some(Box::new(observer));
        self
    }

    /// Called once for every backlog job that has run, after the drain that ran it.
    ///
    /// Jobs that run immediately because the gate was open when they were added never were in
    /// the backlog, so they are not reported here.
    pub fn on_remove(mut self, observer: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_remove = Some(Box::new(observer));
        self
    }

    /// The order in which [`GatedJobQueue::add()`] runs the backlog when it finds the gate open.
    ///
    /// Defaults to [`DrainOrder::NewestFirst`].
    pub fn add_drain_order(mut self, order: DrainOrder) -> Self {
        self.add_drain_order = order;
        self
    }

    /// The order in which [`GatedJobQueue::trigger()`] runs the backlog.
    ///
    /// Defaults to [`DrainOrder::OldestFirst`].
    pub fn trigger_drain_order(mut self, order: DrainOrder) -> Self {
        self.trigger_drain_order = order;
        self
    }

    /// Builds the queue, reading the gate once to learn its initial state.
    #[must_use]
    pub fn build(self) -> GatedJobQueue {
        GatedJobQueue::new_inner(
            self.gate,
            self.on_add,
            self.on_remove,
            self.add_drain_order,
            self.trigger_drain_order,
        )
    }
}
