//! End-to-end behaviour of the tracker through its public API.
//!
//! Covers the live-edit remapping rules, reconciliation against
//! authoritative diffs, and rejection of malformed input.

use caw_tracker::{
    test::{assert_mark_invariants, parse_marks, render_marks},
    ChangeCause, EditRecord, HostChange, LineEnding, LineMapTracker, MarkedLine, TrackerError,
};
use std::path::{Path, PathBuf};

fn file() -> PathBuf {
    PathBuf::from("/repo/src/lib.rs")
}

fn tracker_with(path: &Path, notation: &str) -> LineMapTracker {
    caw_log::test();
    let mut tracker = LineMapTracker::new();
    tracker
        .reconcile(path, parse_marks(notation))
        .expect("valid authoritative marks");
    tracker
}

#[test]
fn pasting_lines_shifts_marks_below() {
    let mut tracker = tracker_with(&file(), "5+1 10+1");

    tracker
        .apply_edit(&file(), EditRecord::new(3, 3, 2))
        .unwrap();

    assert_eq!(
        tracker.marks(&file()),
        &[MarkedLine::new(7, 1), MarkedLine::new(12, 1)]
    );
}

#[test]
fn deleting_a_block_collapses_inner_mark() {
    let mut tracker = tracker_with(&file(), "9+1");

    tracker
        .apply_edit(&file(), EditRecord::new(8, 13, 1))
        .unwrap();

    assert_eq!(tracker.marks(&file()), &[MarkedLine::new(8, 1)]);
}

#[test]
fn marks_meeting_on_one_line_merge() {
    let mut tracker = tracker_with(&file(), "9+1 12+2");

    tracker
        .apply_edit(&file(), EditRecord::new(8, 13, 0))
        .unwrap();

    assert_eq!(render_marks(tracker.marks(&file())), "8+2");
}

#[test]
fn host_changes_are_reduced_to_line_edits() {
    let mut tracker = tracker_with(&file(), "4+1");
    let changes = [
        HostChange::new(0, 0, "use std::fmt;\r\n"),
        HostChange::new(1, 3, ""),
        HostChange::new(2, 2, "a\nb\nc\n"),
    ];

    for change in &changes {
        tracker
            .apply_edit(&file(), EditRecord::from_change(change, LineEnding::Auto))
            .unwrap();
    }

    // 4 -> 5 (one line added above) -> 3 (two removed above) -> 6 (three added above)
    assert_eq!(render_marks(tracker.marks(&file())), "6+1");
    assert_eq!(
        tracker.pending_edits(&file()),
        &[
            EditRecord::new(0, 0, 1),
            EditRecord::new(1, 3, 0),
            EditRecord::new(2, 2, 3),
        ]
    );
}

#[test]
fn reconciliation_supersedes_pending_edits() {
    let mut tracker = tracker_with(&file(), "3+1 7+2");
    let rx = tracker.subscribe();
    let seq = tracker.begin_diff_request(&file());

    for edit in [
        EditRecord::insertion(0, 2),
        EditRecord::new(4, 4, 1),
        EditRecord::new(10, 12, 0),
    ] {
        tracker.apply_edit(&file(), edit).unwrap();
    }
    assert!(tracker.is_current_request(&file(), seq));

    let authoritative = parse_marks("2+1 6+4 20+0");
    tracker.reconcile(&file(), authoritative.clone()).unwrap();

    assert_eq!(tracker.marks(&file()), authoritative.as_slice());
    assert!(tracker.pending_edits(&file()).is_empty());
    assert!(tracker.should_request_diff(&file()));

    let causes: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|update| update.cause)
        .collect();
    assert_eq!(
        causes,
        vec![
            ChangeCause::LiveEdit,
            ChangeCause::LiveEdit,
            ChangeCause::LiveEdit,
            ChangeCause::Reconciled,
        ]
    );
}

#[test]
fn reconciling_twice_matches_reconciling_once() {
    let mut tracker = tracker_with(&file(), "1+1");
    tracker
        .apply_edit(&file(), EditRecord::insertion(0, 1))
        .unwrap();

    let authoritative = parse_marks("0+2 5+1");
    tracker.reconcile(&file(), authoritative.clone()).unwrap();
    let once = tracker.marks(&file()).to_vec();
    tracker.reconcile(&file(), authoritative).unwrap();

    assert_eq!(tracker.marks(&file()), once.as_slice());
}

#[test]
fn reversed_range_is_rejected() {
    let mut tracker = tracker_with(&file(), "2+1 6+1");

    let result = tracker.apply_edit(&file(), EditRecord::new(5, 3, 1));

    assert_eq!(
        result,
        Err(TrackerError::InvalidRange {
            start_line: 5,
            end_line: 3,
        })
    );
    assert_eq!(render_marks(tracker.marks(&file())), "2+1 6+1");
}

#[test]
fn overlapping_authoritative_marks_are_rejected() {
    let mut tracker = tracker_with(&file(), "2+1");

    let result = tracker.reconcile(&file(), parse_marks("1+5 4+1"));

    assert!(matches!(result, Err(TrackerError::InvalidMarkSet { .. })));
    assert_eq!(render_marks(tracker.marks(&file())), "2+1");
}

#[test]
fn files_are_tracked_independently() {
    let other = PathBuf::from("/repo/src/main.rs");
    let mut tracker = tracker_with(&file(), "5+1");
    tracker.reconcile(&other, parse_marks("5+1")).unwrap();

    tracker
        .apply_edit(&file(), EditRecord::insertion(0, 3))
        .unwrap();

    assert_eq!(render_marks(tracker.marks(&file())), "8+1");
    assert_eq!(render_marks(tracker.marks(&other)), "5+1");
    assert!(tracker.pending_edits(&other).is_empty());
}

#[test]
fn long_editing_session_keeps_invariants() {
    let mut tracker = tracker_with(&file(), "0+1 3+2 6+0 7+1 12+4 30+1");
    let edits = [
        EditRecord::insertion(0, 1),
        EditRecord::new(2, 9, 0),
        EditRecord::new(0, 1, 5),
        EditRecord::insertion(40, 10),
        EditRecord::new(5, 30, 2),
        EditRecord::new(0, 0, 0),
    ];

    for edit in edits {
        tracker.apply_edit(&file(), edit).unwrap();
        assert_mark_invariants(tracker.marks(&file()));
    }
    assert!(!tracker.marks(&file()).is_empty());
}
