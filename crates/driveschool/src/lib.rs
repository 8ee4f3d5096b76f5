//! Enrollment lifecycle service for a multi-branch driving school.
//!
//! The library owns the application review state machine, payment recording,
//! identifier generation, and the branch-scoped authorization predicate. The
//! HTTP surface, notifier, and document generation sit behind narrow traits so
//! the lifecycle rules can be exercised without any transport or delivery
//! machinery attached.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
