//! Metrics for the gated job queue.

use nm::{Event, Magnitude};

/// Histogram buckets for the number of jobs run by one drain round.
///
/// Backlogs are expected to be short: a handful of jobs that piled up while the gate was closed.
const DRAIN_BATCH_SIZE_BUCKETS: &[Magnitude] = &[1, 2, 4, 8, 16, 32, 64, 128, 256];

thread_local! {
    /// A job was added to the backlog instead of running immediately.
    pub(crate) static JOBS_DEFERRED: Event = Event::builder()
        .name("gated_queue_jobs_deferred")
        .build();

    /// A drain round ran a batch of backlog jobs.
    ///
    /// The magnitude is the number of jobs in the batch.
    pub(crate) static JOBS_DRAINED: Event = Event::builder()
        .name("gated_queue_jobs_drained")
        .histogram(DRAIN_BATCH_SIZE_BUCKETS)
        .build();
}
