#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe multimap of non-owning references, for listener registries.
//!
//! The host owns its listeners and registers them under keys in a [`ReferenceMap`]. The map
//! keeps only weak references, so it never extends the life of a listener, and it tells the host
//! when a key gains its first listener (to start an upstream subscription) and when the map as a
//! whole gains or loses its last "full" group (to toggle some aggregate state).
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use reference_map::ReferenceMap;
//!
//! let map = ReferenceMap::<&str, dyn Fn(u32) + Send + Sync>::builder()
//!     .fullness_listener(|_map, is_full| println!("any listeners at all: {is_full}"))
//!     .build();
//!
//! let on_click: Arc<dyn Fn(u32) + Send + Sync> = Arc::new(|x| println!("clicked at {x}"));
//!
//! if map.add("click", &on_click) {
//!     println!("first click listener, start listening upstream");
//! }
//!
//! for listener in map.iterator("click").into_iter().flatten() {
//!     listener(42);
//! }
//!
//! map.remove("click", &*on_click);
//! assert!(!map.has("click"));
//! ```
//!
//! # Key features
//!
//! - **Identity semantics**: Items are compared by address, so two equal-looking listeners are
//!   still two listeners.
//! - **Pooled groups**: Groups emptied by removals are kept for the next key, so key churn does
//!   not allocate.
//! - **Aggregate fullness**: A [`FullnessListener`] hears when the map goes from no full group to
//!   some, and back, exactly once per change and with no lock held.
//! - **Flexible iteration**: Snapshot or live iteration, optionally serialized per group.
//!
//! # Building blocks
//!
//! [`GroupList`] and [`FullnessCounter`] can also be used on their own, for example when a
//! single list of listeners is needed without any keys.

mod builder;
mod duplicate_policy;
mod fullness;
mod group_list;
mod guard;
mod iter;
mod map;
mod metrics;

pub use builder::*;
pub use duplicate_policy::*;
pub use fullness::*;
pub(crate) use group_list::{Entry, GroupOptions};
pub use group_list::{GroupList, GroupSnapshot, Iter};
pub use guard::*;
pub(crate) use iter::IterationGate;
pub use iter::*;
pub(crate) use map::MapState;
pub use map::*;
