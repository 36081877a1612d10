//! Errors reported by the tracker.
//!
//! Both variants are recoverable: the call that produced them leaves the
//! file's marks untouched.

use thiserror::Error;

/// Errors that can occur while applying edits or authoritative diffs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// An edit whose range ends before it starts.
    #[error("edit range ends on line {end_line} before it starts on line {start_line}")]
    InvalidRange { start_line: u32, end_line: u32 },

    /// An authoritative mark set that breaks the ordering invariant.
    #[error("authoritative mark {index} {reason}")]
    InvalidMarkSet {
        /// Index of the first offending mark
        index: usize,
        reason: MarkSetViolation,
    },
}

/// How an authoritative mark set failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MarkSetViolation {
    #[error("is not sorted after the previous mark")]
    Unsorted,
    #[error("overlaps the previous mark")]
    Overlap,
    #[error("extends past the last addressable line")]
    Overflow,
}
