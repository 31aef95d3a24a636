//! Processing-status tracking for long-running index operations
//!
//! Every mutation moves the shared `ProcessingStatus` through
//! `Idle -> Processing -> Idle | Error` and broadcasts a snapshot of the new
//! status to all subscribers once the status lock has been released.

pub mod tracker;
pub mod types;

pub use tracker::StatusTracker;
pub use types::{MAX_ERROR_MESSAGES, ProcessingState, ProcessingStatus};
