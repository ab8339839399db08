#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A job queue that holds work back until a gate opens.
//!
//! The host supplies the gate, a predicate telling whether jobs may run right now. While the gate
//! is open, jobs added to a [`GatedJobQueue`] run immediately on the calling thread. While it is
//! closed, they wait in a backlog until the host calls [`trigger()`][GatedJobQueue::trigger]
//! after the gate opens.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! use gated_queue::GatedJobQueue;
//!
//! let connected = Arc::new(AtomicBool::new(false));
//!
//! let queue = GatedJobQueue::new({
//!     let connected = Arc::clone(&connected);
//!     move || connected.load(Ordering::Relaxed)
//! });
//!
//! queue.add(|| println!("sending hello"));
//!
//! // Later, once the connection is up.
//! connected.store(true, Ordering::Relaxed);
//! queue.trigger();
//! ```
//!
//! # Observers
//!
//! [`GatedJobQueueBuilder::on_add()`] and [`GatedJobQueueBuilder::on_remove()`] let the host
//! track the size of the backlog, for example to show a "waiting" indicator.

mod builder;
mod drain_order;
mod error;
mod gate;
mod metrics;
mod queue;

pub use builder::GatedJobQueueBuilder;
pub use drain_order::*;
pub use error::Error;
pub use gate::*;
pub use queue::*;
