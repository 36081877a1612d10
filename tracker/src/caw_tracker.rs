//! Incremental line-mark tracking for Code Awareness.
//!
//! Peer changes are shown in the editor as marked line ranges. Recomputing a
//! full diff on every keystroke is too expensive, so [`LineMapTracker`] keeps
//! the previously computed marks positioned while the user types, and swaps in
//! the authoritative result when the remote diff service answers.
//!
//! # Architecture
//!
//! ```text
//! host edit events --> EditRecord --> LineMapTracker::apply_edit --+
//!                                                                 +--> MarksChanged
//! peer diff service --> Vec<MarkedLine> --> LineMapTracker::reconcile
//! ```
//!
//! - [`MarkedLine`] / [`FileMarkSet`] - the sorted, non-overlapping mark ranges of one file
//! - [`EditRecord`] / [`HostChange`] - line-level edits as reported by the host
//! - [`LineMapTracker`] - per-file marks, pending edits and diff request bookkeeping
//!
//! Stale diff results are the caller's concern: every request gets a
//! [`RequestSeq`] and only the in-flight one is accepted by
//! [`LineMapTracker::is_current_request`].

pub mod edit;
pub mod error;
pub mod mark;
pub mod tracker;

// Make test utilities available for both unit and integration tests
#[cfg(any(test, feature = "test-support"))]
pub mod test;

pub use edit::*;
pub use error::*;
pub use mark::*;
pub use tracker::*;
