//! Per-file mark tracking under live edits.
//!
//! [`LineMapTracker`] owns the marks of every tracked file together with the
//! edits applied since the last authoritative diff and the diff request that
//! is currently in flight.
//!
//! # Policy
//!
//! Live edits are applied to the current marks right away so the editor never
//! paints stale positions. When an authoritative diff lands it replaces the
//! marks wholesale: pending edits are dropped, not replayed, because the diff
//! was computed against a buffer that already contains them.
//!
//! # Notifications
//!
//! Every change to a file's marks is broadcast as [`MarksChanged`] to the
//! channels handed out by [`LineMapTracker::subscribe`]. Delivery is
//! fire-and-forget; closed channels are pruned on the next send.

use crate::{EditRecord, FileMarkSet, MarkedLine, TrackerError};
use async_channel::{Receiver, Sender};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Identifies one diff request.
///
/// Allocated from a single counter shared by all files, so a result that
/// arrives after its file was closed and reopened can never match a newer
/// request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestSeq(u64);

impl RequestSeq {
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Why a file's marks changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// Marks were shifted by a live edit
    LiveEdit,
    /// Marks were replaced by an authoritative diff
    Reconciled,
    /// The file stopped being tracked; its marks are gone
    Closed,
}

/// Notification that the marks of a file changed and should be repainted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarksChanged {
    pub path: PathBuf,
    pub cause: ChangeCause,
}

/// Most edits kept per file between reconciliations. Older edits are
/// dropped first.
pub const PENDING_EDIT_LIMIT: usize = 256;

#[derive(Debug, Default)]
struct FileState {
    /// `None` until the first authoritative diff arrives
    marks: Option<FileMarkSet>,
    /// Edits applied since the last reconciliation
    pending: SmallVec<[EditRecord; 4]>,
    in_flight: Option<RequestSeq>,
}

/// Keeps each file's marks valid under a live stream of edits.
#[derive(Debug, Default)]
pub struct LineMapTracker {
    files: FxHashMap<PathBuf, FileState>,
    /// Last allocated request number
    last_request: u64,
    subscribers: Vec<Sender<MarksChanged>>,
}

impl LineMapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to mark change notifications for all files.
    pub fn subscribe(&mut self) -> Receiver<MarksChanged> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Shift the marks of `path` through a live edit.
    ///
    /// Runs in time linear in the number of marks and never touches the file
    /// contents. The edit is appended to the file's pending edits even when
    /// no authoritative marks exist yet; past [`PENDING_EDIT_LIMIT`] the
    /// oldest pending edit is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRange`] if `edit` ends before it starts;
    /// nothing is changed in that case.
    pub fn apply_edit(&mut self, path: &Path, edit: EditRecord) -> Result<(), TrackerError> {
        edit.validate()?;

        let state = self.files.entry(path.to_path_buf()).or_default();
        if let Some(marks) = state.marks.as_mut() {
            marks.remap(&edit);
        }
        if state.pending.len() == PENDING_EDIT_LIMIT {
            state.pending.remove(0);
        }
        state.pending.push(edit);
        trace!(path = %path.display(), ?edit, pending = state.pending.len(), "applied live edit");

        self.notify(path, ChangeCause::LiveEdit);
        Ok(())
    }

    /// Replace the marks of `path` with an authoritative diff result.
    ///
    /// Clears the pending edits and the in-flight request. Applying the same
    /// result twice leaves the same marks as applying it once.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidMarkSet`] if `marks` is not sorted and
    /// non-overlapping; the previous marks and pending edits are kept.
    pub fn reconcile(&mut self, path: &Path, marks: Vec<MarkedLine>) -> Result<(), TrackerError> {
        let marks = FileMarkSet::from_authoritative(marks)?;

        let state = self.files.entry(path.to_path_buf()).or_default();
        debug!(
            path = %path.display(),
            marks = marks.len(),
            superseded = state.pending.len(),
            "reconciled authoritative diff"
        );
        state.marks = Some(marks);
        state.pending.clear();
        state.in_flight = None;

        self.notify(path, ChangeCause::Reconciled);
        Ok(())
    }

    /// Whether a new diff request may be issued for `path`.
    ///
    /// False while a request for the file is in flight.
    pub fn should_request_diff(&self, path: &Path) -> bool {
        !self
            .files
            .get(path)
            .is_some_and(|state| state.in_flight.is_some())
    }

    /// Record that a diff request for `path` was issued.
    ///
    /// Any request already in flight for the file becomes stale.
    pub fn begin_diff_request(&mut self, path: &Path) -> RequestSeq {
        self.last_request += 1;
        let seq = RequestSeq(self.last_request);

        let state = self.files.entry(path.to_path_buf()).or_default();
        if let Some(previous) = state.in_flight.replace(seq) {
            debug!(path = %path.display(), ?previous, ?seq, "superseded in-flight diff request");
        }
        seq
    }

    /// Whether `seq` is the request currently in flight for `path`.
    pub fn is_current_request(&self, path: &Path, seq: RequestSeq) -> bool {
        self.files
            .get(path)
            .is_some_and(|state| state.in_flight == Some(seq))
    }

    /// Give up on request `seq` so that a new one can be issued.
    ///
    /// Does nothing if `seq` is no longer the in-flight request.
    pub fn abandon_diff_request(&mut self, path: &Path, seq: RequestSeq) {
        if let Some(state) = self.files.get_mut(path) {
            if state.in_flight == Some(seq) {
                state.in_flight = None;
            }
        }
    }

    /// Current marks of `path`, sorted by line. Empty for untracked files.
    pub fn marks(&self, path: &Path) -> &[MarkedLine] {
        self.mark_set(path)
            .map(FileMarkSet::as_slice)
            .unwrap_or_default()
    }

    /// The mark set of `path`, if an authoritative diff was ever applied.
    pub fn mark_set(&self, path: &Path) -> Option<&FileMarkSet> {
        self.files.get(path).and_then(|state| state.marks.as_ref())
    }

    /// Edits applied to `path` since its last reconciliation.
    pub fn pending_edits(&self, path: &Path) -> &[EditRecord] {
        self.files
            .get(path)
            .map(|state| state.pending.as_slice())
            .unwrap_or_default()
    }

    /// All files with tracker state.
    pub fn tracked_files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Forget everything about `path`. Returns whether it was tracked.
    pub fn close_file(&mut self, path: &Path) -> bool {
        if self.files.remove(path).is_none() {
            return false;
        }
        debug!(path = %path.display(), "closed tracked file");
        self.notify(path, ChangeCause::Closed);
        true
    }

    /// Forget every file below `root`, e.g. when a project folder is removed.
    pub fn close_files_under(&mut self, root: &Path) -> usize {
        let closed: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect();

        for path in &closed {
            self.close_file(path);
        }
        closed.len()
    }

    fn notify(&mut self, path: &Path, cause: ChangeCause) {
        self.subscribers.retain(|tx| !tx.is_closed());
        if self.subscribers.is_empty() {
            return;
        }

        let update = MarksChanged {
            path: path.to_path_buf(),
            cause,
        };
        for tx in &self.subscribers {
            let _ = tx.try_send(update.clone());
        }
    }
}
