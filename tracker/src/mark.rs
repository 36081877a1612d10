//! Marked line ranges.
//!
//! A [`MarkedLine`] highlights lines a peer changed. A [`FileMarkSet`] holds
//! every mark of one file and keeps them sorted by line and non-overlapping:
//!
//! ```text
//! marks[i].line + marks[i].length <= marks[i + 1].line
//! ```
//!
//! Live edits move marks through [`FileMarkSet::remap`]; they never delete a
//! mark. Only an authoritative mark set, built with
//! [`FileMarkSet::from_authoritative`], can make marks disappear.

use crate::{EditRecord, MarkSetViolation, TrackerError};
use serde::{Deserialize, Serialize};

/// A range of consecutive lines in the live buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkedLine {
    /// First marked line (zero-indexed)
    pub line: u32,
    /// Number of lines covered. Zero marks a point, e.g. where a peer deleted lines.
    pub length: u32,
}

impl MarkedLine {
    pub const fn new(line: u32, length: u32) -> Self {
        Self { line, length }
    }

    /// Line just past the mark.
    pub fn end(&self) -> u32 {
        self.line.saturating_add(self.length)
    }

    /// Whether `row` falls on this mark. Zero-length marks cover their own line.
    pub fn contains_row(&self, row: u32) -> bool {
        if self.length == 0 {
            row == self.line
        } else {
            self.line <= row && row < self.end()
        }
    }
}

/// The ordered, non-overlapping marks of one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMarkSet {
    marks: Vec<MarkedLine>,
}

impl FileMarkSet {
    /// Create an empty mark set.
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    /// Build a mark set from an authoritative diff result.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidMarkSet`] if the marks are not
    /// sorted, overlap, or run past `u32::MAX`.
    pub fn from_authoritative(marks: Vec<MarkedLine>) -> Result<Self, TrackerError> {
        validate(&marks)?;
        Ok(Self { marks })
    }

    pub fn as_slice(&self) -> &[MarkedLine] {
        &self.marks
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkedLine> {
        self.marks.iter()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Find the mark covering `row`, if any.
    pub fn mark_for_row(&self, row: u32) -> Option<&MarkedLine> {
        let idx = self.marks.partition_point(|mark| mark.line <= row);
        idx.checked_sub(1)
            .map(|idx| &self.marks[idx])
            .filter(|mark| mark.contains_row(row))
    }

    /// Move every mark through `edit`, merging marks the edit brought together.
    ///
    /// For a mark starting on line `m`:
    ///
    /// - `m < start_line`: unchanged
    /// - `m == start_line` of a pure insertion: unchanged
    /// - otherwise: `max(start_line, m + net_shift)`
    ///
    /// Marks inside a removed span are pulled up to the edit's start line
    /// instead of being dropped. The mapping is monotonic, so order survives
    /// and one pass merges neighbours that now overlap, or that now touch
    /// but did not before the edit. Neighbours that already touched stay
    /// separate.
    pub fn remap(&mut self, edit: &EditRecord) {
        let start = edit.start_line;
        let shift = edit.net_shift();
        let pure_insertion = edit.removed_span() == 0;

        let mut remapped: Vec<MarkedLine> = Vec::with_capacity(self.marks.len());
        let mut previous: Option<MarkedLine> = None;
        for original in self.marks.drain(..) {
            let mut mark = original;
            if !(mark.line < start || (pure_insertion && mark.line == start)) {
                mark.line = shift_line(mark.line, shift, start);
            }
            mark.length = mark.length.min(u32::MAX - mark.line);

            let touched_before = previous.is_some_and(|prev| prev.end() == original.line);
            previous = Some(original);

            match remapped.last_mut() {
                Some(last) if joins(last, &mark, touched_before) => {
                    let end = last.end().max(mark.end());
                    last.length = end - last.line;
                },
                _ => remapped.push(mark),
            }
        }
        self.marks = remapped;
    }
}

/// Whether `next` must be merged into `last` after a remap.
fn joins(last: &MarkedLine, next: &MarkedLine, touched_before: bool) -> bool {
    next.line < last.end() || (next.line == last.end() && !touched_before)
}

impl<'a> IntoIterator for &'a FileMarkSet {
    type Item = &'a MarkedLine;
    type IntoIter = std::slice::Iter<'a, MarkedLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.marks.iter()
    }
}

/// Check the ordering invariant of an authoritative mark set.
pub fn validate(marks: &[MarkedLine]) -> Result<(), TrackerError> {
    let mut prev: Option<&MarkedLine> = None;
    for (index, mark) in marks.iter().enumerate() {
        let violation = if mark.line.checked_add(mark.length).is_none() {
            Some(MarkSetViolation::Overflow)
        } else {
            match prev {
                Some(prev) if mark.line < prev.line => Some(MarkSetViolation::Unsorted),
                Some(prev) if prev.end() > mark.line => Some(MarkSetViolation::Overlap),
                _ => None,
            }
        };

        if let Some(reason) = violation {
            return Err(TrackerError::InvalidMarkSet { index, reason });
        }
        prev = Some(mark);
    }
    Ok(())
}

/// Apply a signed shift to a line, never landing above `floor`.
fn shift_line(line: u32, shift: i64, floor: u32) -> u32 {
    let moved = i64::from(line).saturating_add(shift);
    let clamped = moved.clamp(i64::from(floor), i64::from(u32::MAX));
    u32::try_from(clamped).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{parse_marks, render_marks};

    fn mark_set(notation: &str) -> FileMarkSet {
        FileMarkSet::from_authoritative(parse_marks(notation)).expect("valid marks")
    }

    fn remapped(notation: &str, edit: EditRecord) -> String {
        let mut set = mark_set(notation);
        set.remap(&edit);
        render_marks(set.as_slice())
    }

    #[test]
    fn insertion_shifts_marks_below() {
        assert_eq!(remapped("5+1 10+1", EditRecord::new(3, 3, 2)), "7+1 12+1");
    }

    #[test]
    fn insertion_on_mark_line_keeps_mark() {
        // Pressing enter somewhere inside line 2
        assert_eq!(remapped("2+1 9+1", EditRecord::insertion(2, 1)), "2+1 10+1");
    }

    #[test]
    fn marks_above_edit_are_untouched() {
        assert_eq!(remapped("1+1 4+2", EditRecord::new(20, 25, 0)), "1+1 4+2");
    }

    #[test]
    fn deletion_collapses_to_start_line() {
        assert_eq!(remapped("9+1", EditRecord::new(8, 13, 1)), "8+1");
    }

    #[test]
    fn deletion_shifts_marks_below_up() {
        assert_eq!(remapped("2+1 20+3", EditRecord::new(8, 13, 0)), "2+1 15+3");
    }

    #[test]
    fn marks_landing_on_same_line_coalesce() {
        assert_eq!(remapped("9+2 12+3", EditRecord::new(8, 13, 0)), "8+3");
    }

    #[test]
    fn unrelated_edit_keeps_touching_marks_apart() {
        assert_eq!(remapped("3+2 5+1", EditRecord::new(100, 100, 0)), "3+2 5+1");
        assert_eq!(remapped("3+2 5+1", EditRecord::insertion(0, 2)), "5+2 7+1");
    }

    #[test]
    fn marks_brought_together_coalesce() {
        assert_eq!(remapped("3+2 6+1 9+1", EditRecord::new(5, 6, 0)), "3+3 8+1");
    }

    #[test]
    fn mark_spanning_edit_absorbs_shifted_mark() {
        // 3..7 stays put, 8 is pulled up into it
        assert_eq!(remapped("3+4 8+1", EditRecord::new(5, 7, 0)), "3+4");
    }

    #[test]
    fn replacement_with_more_lines_moves_inner_marks_down() {
        assert_eq!(remapped("5+1", EditRecord::new(4, 6, 4)), "7+1");
    }

    #[test]
    fn shift_saturates_at_last_line() {
        let mut set = FileMarkSet::from_authoritative(vec![MarkedLine::new(u32::MAX - 1, 0)])
            .expect("valid marks");
        set.remap(&EditRecord::insertion(0, 10));
        assert_eq!(set.as_slice(), &[MarkedLine::new(u32::MAX, 0)]);
    }

    #[test]
    fn shifted_length_stays_within_line_range() {
        let mut set = FileMarkSet::from_authoritative(vec![MarkedLine::new(u32::MAX - 3, 2)])
            .expect("valid marks");
        set.remap(&EditRecord::insertion(0, 10));
        assert_eq!(set.as_slice(), &[MarkedLine::new(u32::MAX, 0)]);
        assert!(validate(set.as_slice()).is_ok());
    }

    #[test]
    fn validate_accepts_touching_marks() {
        assert!(validate(&parse_marks("1+2 3+1 4+0 5+1")).is_ok());
    }

    #[test]
    fn validate_rejects_unsorted() {
        let err = validate(&parse_marks("5+1 3+1")).unwrap_err();
        assert_eq!(
            err,
            TrackerError::InvalidMarkSet {
                index: 1,
                reason: MarkSetViolation::Unsorted,
            }
        );
    }

    #[test]
    fn validate_accepts_point_mark_sharing_a_line() {
        assert!(validate(&parse_marks("4+0 4+2")).is_ok());
        assert!(validate(&parse_marks("4+0 4+0")).is_ok());
    }

    #[test]
    fn validate_rejects_point_mark_inside_range() {
        let err = validate(&parse_marks("4+2 4+0")).unwrap_err();
        assert_eq!(
            err,
            TrackerError::InvalidMarkSet {
                index: 1,
                reason: MarkSetViolation::Overlap,
            }
        );
    }

    #[test]
    fn validate_rejects_overlap() {
        let err = validate(&parse_marks("1+3 3+1")).unwrap_err();
        assert_eq!(
            err,
            TrackerError::InvalidMarkSet {
                index: 1,
                reason: MarkSetViolation::Overlap,
            }
        );
    }

    #[test]
    fn validate_rejects_overflowing_mark() {
        let err = validate(&[MarkedLine::new(u32::MAX, 1)]).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidMarkSet {
                index: 0,
                reason: MarkSetViolation::Overflow,
            }
        ));
    }

    #[test]
    fn mark_for_row_finds_covering_mark() {
        let set = mark_set("2+3 8+0");
        assert_eq!(set.mark_for_row(1), None);
        assert_eq!(set.mark_for_row(2), Some(&MarkedLine::new(2, 3)));
        assert_eq!(set.mark_for_row(4), Some(&MarkedLine::new(2, 3)));
        assert_eq!(set.mark_for_row(5), None);
        assert_eq!(set.mark_for_row(8), Some(&MarkedLine::new(8, 0)));
    }
}
