use thiserror::Error;

/// Errors reported by [`GatedJobQueue`][crate::GatedJobQueue].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The gate was read as open, same as the previous time it was read, but jobs were still
    /// waiting in the backlog.
    ///
    /// An open gate is always serviced until the backlog is empty, so this means the queue was
    /// bypassed or the gate opened without anyone noticing it in between two reads.
    #[error("gate is open and was open before, yet {pending} jobs are still waiting to run")]
    OpenGateWithBacklog {
        /// The number of jobs found in the backlog.
        pending: usize,
    },
}

/// A specialized `Result` type for gated queue operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
