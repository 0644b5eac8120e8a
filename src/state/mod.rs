//! State module for tracking harvest progress
//!
//! This module holds the shared, individually synchronized state that workers
//! coordinate through.
//!
//! # Components
//!
//! - `Request` / `RequestState`: a unit of work and its lifecycle
//! - `SeenSet`: at-most-once claim of canonical URLs
//! - `TerminationController`: saved count, per-seed page budgets and cancellation

mod counters;
mod request;
mod seen;

// Re-export main types
pub use counters::TerminationController;
pub use request::{PageKind, Request, RequestState};
pub use seen::SeenSet;
