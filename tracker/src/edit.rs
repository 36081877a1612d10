//! Line-level edit records.
//!
//! The host reports each document change as a replaced range plus the
//! inserted text. The tracker only cares about lines, so a [`HostChange`] is
//! reduced to an [`EditRecord`]: which pre-edit lines were replaced and how
//! many extra line breaks the inserted text brings in.
//!
//! ```text
//! delete lines 8..=13, type one line break  -> EditRecord { 8, 13, 1 }
//! paste two lines somewhere inside line 3   -> EditRecord { 3, 3, 2 }
//! ```

use crate::TrackerError;
use serde::{Deserialize, Serialize};

/// One atomic change, in pre-edit line coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditRecord {
    /// First replaced line (zero-indexed, inclusive)
    pub start_line: u32,
    /// Last replaced line (inclusive). Equal to `start_line` for pure insertions.
    pub end_line: u32,
    /// Number of line breaks in the inserted text
    pub inserted_line_count: u32,
}

impl EditRecord {
    pub const fn new(start_line: u32, end_line: u32, inserted_line_count: u32) -> Self {
        Self {
            start_line,
            end_line,
            inserted_line_count,
        }
    }

    /// Text inserted inside a single line, without removing any line break.
    pub const fn insertion(line: u32, inserted_line_count: u32) -> Self {
        Self::new(line, line, inserted_line_count)
    }

    /// Reduce a raw host change to its line-level effect.
    pub fn from_change(change: &HostChange, line_ending: LineEnding) -> Self {
        Self::new(
            change.start_line,
            change.end_line,
            line_ending.count_breaks(&change.inserted_text),
        )
    }

    /// Reject ranges that end before they start.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.end_line < self.start_line {
            return Err(TrackerError::InvalidRange {
                start_line: self.start_line,
                end_line: self.end_line,
            });
        }
        Ok(())
    }

    /// Number of line breaks removed from the pre-edit buffer.
    pub fn removed_span(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line)
    }

    /// How far lines after the edit move. Negative when lines were removed.
    pub fn net_shift(&self) -> i64 {
        i64::from(self.inserted_line_count) - i64::from(self.removed_span())
    }
}

/// A document change as the host editor reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostChange {
    pub start_line: u32,
    pub end_line: u32,
    /// Replacement text; empty for pure deletions
    #[serde(default)]
    pub inserted_text: String,
}

impl HostChange {
    pub fn new(start_line: u32, end_line: u32, inserted_text: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            inserted_text: inserted_text.into(),
        }
    }
}

/// Which sequences count as a line break in inserted text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n`, lone `\r` and lone `\n` each count once
    #[default]
    Auto,
    /// Only `\n`
    Lf,
    /// Only `\r\n`
    CrLf,
}

impl LineEnding {
    /// Count line breaks in `text`.
    pub fn count_breaks(self, text: &str) -> u32 {
        let count = match self {
            LineEnding::Lf => text.matches('\n').count(),
            LineEnding::CrLf => text.matches("\r\n").count(),
            LineEnding::Auto => {
                let bytes = text.as_bytes();
                let mut count = 0;
                let mut i = 0;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\r' => {
                            count += 1;
                            if bytes.get(i + 1) == Some(&b'\n') {
                                i += 1;
                            }
                        },
                        b'\n' => count += 1,
                        _ => {},
                    }
                    i += 1;
                }
                count
            },
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
