/// Decides whether a [`GatedJobQueue`][crate::GatedJobQueue] may run jobs right now.
///
/// The queue reads the gate while holding its lock, on every [`add()`][1] and [`trigger()`][2].
/// A gate must not call back into the queue that reads it.
///
/// Any `Fn() -> bool` closure that is `Send + Sync + 'static` is a gate.
///
/// [1]: crate::GatedJobQueue::add
/// [2]: crate::GatedJobQueue::trigger
#[cfg_attr(test, mockall::automock)]
pub trait Gate: Send + Sync + 'static {
    /// Whether jobs may run now.
    fn can_execute(&self) -> bool;
}

impl<F> Gate for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn can_execute(&self) -> bool {
        self()
    }
}
