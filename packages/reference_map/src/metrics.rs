//! Metrics for the reference map.
//!
//! These track how groups move between the active set and the pool, which tells whether the pool
//! is doing its job under the observed key churn.

use nm::Event;

thread_local! {
    /// A group was created because the pool was empty.
    pub(crate) static GROUPS_ALLOCATED: Event = Event::builder()
        .name("reference_map_groups_allocated")
        .build();

    /// A pooled group was handed out again instead of allocating a new one.
    pub(crate) static GROUPS_REUSED: Event = Event::builder()
        .name("reference_map_groups_reused")
        .build();

    /// A group became empty and was returned to the pool.
    pub(crate) static GROUPS_RECYCLED: Event = Event::builder()
        .name("reference_map_groups_recycled")
        .build();
}
