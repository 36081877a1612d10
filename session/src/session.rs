//! Host-facing session context.
//!
//! [`Session`] is the single object the editor integration talks to. It owns
//! the [`LineMapTracker`], the open projects, the active file and the side
//! panel lifecycle, and drives diff requests against a [`PeerDiffProvider`].
//!
//! The tracker lives behind a [`Mutex`] that is never held across an await:
//! provider calls run with the lock released, and their results are matched
//! back to the request by [`RequestSeq`].

use crate::{
    Command, Config, MarksUpdate, PanelLifecycle, PanelMessage, PeerDiffProvider, ProjectInfo,
    ToggleAction,
};
use anyhow::{Context as _, Result};
use async_channel::Receiver;
use caw_tracker::{
    EditRecord, HostChange, LineMapTracker, MarkedLine, MarksChanged, RequestSeq,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to a diff result handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    /// The marks replaced the file's previous marks
    Applied,
    /// The result belonged to a superseded or abandoned request
    Stale,
    /// The marks were malformed; the previous marks are kept
    Rejected,
    /// No request was issued (one is in flight or the throttle is active)
    Skipped,
}

/// Result of [`Session::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Panel(ToggleAction),
    /// `None` when there is no active file
    Refreshed(Option<DiffOutcome>),
    /// The command was received but has no session-side effect
    Acknowledged,
}

/// Shared handle to one editor session. Clones refer to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
    provider: Arc<dyn PeerDiffProvider>,
    config: Arc<Config>,
    client_id: Uuid,
}

struct SessionInner {
    tracker: LineMapTracker,

    /// Workspace folders the host reported
    projects: Vec<PathBuf>,

    active_path: Option<PathBuf>,

    /// When the last diff request for each file was issued
    last_request: FxHashMap<PathBuf, Instant>,

    panel: PanelLifecycle,
}

/// RAII guard that abandons a diff request on drop unless its result was
/// routed back through [`Session::on_diff_result`].
///
/// Covers provider errors as well as a cancelled or timed out refresh.
struct InFlightRequest<'a> {
    inner: &'a Mutex<SessionInner>,
    path: &'a Path,
    seq: RequestSeq,
    routed: bool,
}

impl InFlightRequest<'_> {
    fn into_routed(mut self) -> RequestSeq {
        self.routed = true;
        self.seq
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        if !self.routed {
            debug!(path = %self.path.display(), seq = self.seq.get(), "abandoning diff request");
            self.inner.lock().tracker.abandon_diff_request(self.path, self.seq);
        }
    }
}

impl Session {
    pub fn new(config: Config, provider: Arc<dyn PeerDiffProvider>) -> Self {
        let client_id = Uuid::new_v4();
        info!(%client_id, "starting session");

        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                tracker: LineMapTracker::new(),
                projects: Vec::new(),
                active_path: None,
                last_request: FxHashMap::default(),
                panel: PanelLifecycle::new(),
            })),
            provider,
            config: Arc::new(config),
            client_id,
        }
    }

    /// Identifies this editor instance to the peer service.
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn add_project(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        let mut inner = self.inner.lock();
        if inner.projects.contains(&root) {
            return;
        }
        debug!(root = %root.display(), "added project");
        inner.projects.push(root);
    }

    /// Stop tracking `root` and drop the marks of every file below it.
    pub fn remove_project(&self, root: &Path) {
        let mut inner = self.inner.lock();
        inner.projects.retain(|project| project != root);
        inner.last_request.retain(|path, _| !path.starts_with(root));
        let closed = inner.tracker.close_files_under(root);
        debug!(root = %root.display(), closed, "removed project");
    }

    pub fn projects(&self) -> Vec<PathBuf> {
        self.inner.lock().projects.clone()
    }

    pub fn set_active_path(&self, path: Option<PathBuf>) {
        self.inner.lock().active_path = path;
    }

    pub fn active_path(&self) -> Option<PathBuf> {
        self.inner.lock().active_path.clone()
    }

    /// Apply a batch of host content changes to the marks of `path`.
    ///
    /// Changes are applied one at a time in array order. A change with an
    /// invalid range is logged and skipped.
    pub fn on_document_change(&self, path: &Path, changes: &[HostChange]) {
        let line_ending = self.config.line_endings;
        let mut inner = self.inner.lock();
        for change in changes {
            let edit = EditRecord::from_change(change, line_ending);
            if let Err(err) = inner.tracker.apply_edit(path, edit) {
                warn!(path = %path.display(), "ignoring document change: {err}");
            }
        }
    }

    /// Register a new diff request for `path`.
    ///
    /// Returns `None` while a request is in flight or when the previous request
    /// for the file was issued less than `sync_threshold` ago.
    pub fn begin_diff_request(&self, path: &Path) -> Option<RequestSeq> {
        let mut inner = self.inner.lock();
        if !inner.tracker.should_request_diff(path) {
            debug!(path = %path.display(), "diff request already in flight");
            return None;
        }

        let now = Instant::now();
        if let Some(last) = inner.last_request.get(path) {
            if now.duration_since(*last) < self.config.sync_threshold() {
                debug!(path = %path.display(), "diff request throttled");
                return None;
            }
        }

        inner.last_request.insert(path.to_path_buf(), now);
        Some(inner.tracker.begin_diff_request(path))
    }

    /// Route an authoritative diff result for request `seq` into the tracker.
    pub fn on_diff_result(
        &self,
        path: &Path,
        seq: RequestSeq,
        marks: Vec<MarkedLine>,
    ) -> DiffOutcome {
        let mut inner = self.inner.lock();
        if !inner.tracker.is_current_request(path, seq) {
            debug!(path = %path.display(), seq = seq.get(), "dropping stale diff result");
            return DiffOutcome::Stale;
        }

        match inner.tracker.reconcile(path, marks) {
            Ok(()) => DiffOutcome::Applied,
            Err(err) => {
                warn!(path = %path.display(), seq = seq.get(), "rejecting diff result: {err}");
                inner.tracker.abandon_diff_request(path, seq);
                DiffOutcome::Rejected
            },
        }
    }

    /// Fetch and apply a fresh diff for `path`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error. The request is abandoned first, so the
    /// next refresh is not blocked by it. Dropping the returned future before
    /// it completes abandons the request too.
    pub async fn refresh_diff(&self, path: &Path) -> Result<DiffOutcome> {
        let Some(seq) = self.begin_diff_request(path) else {
            return Ok(DiffOutcome::Skipped);
        };
        let request = InFlightRequest {
            inner: &self.inner,
            path,
            seq,
            routed: false,
        };

        debug!(path = %path.display(), seq = seq.get(), "requesting peer diff");
        let fetched = self.provider.fetch_diff(path).await;

        match fetched {
            Ok(marks) => Ok(self.on_diff_result(path, request.into_routed(), marks)),
            Err(err) => {
                drop(request);
                Err(err).with_context(|| format!("Failed to fetch diff for {}", path.display()))
            },
        }
    }

    /// Refresh the active file, if any.
    pub async fn refresh_active(&self) -> Result<Option<DiffOutcome>> {
        let Some(path) = self.active_path() else {
            return Ok(None);
        };
        self.refresh_diff(&path).await.map(Some)
    }

    /// Refresh the active file every `sync_interval` until `cancel` fires.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_sync_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        let period = self.config.sync_interval().max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("sync loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                debug!("sync loop stopped during refresh");
                                break;
                            }
                            result = session.refresh_active() => {
                                if let Err(err) = result {
                                    warn!("background diff sync failed: {err:#}");
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    /// Forget `path`. Returns whether it was tracked.
    pub fn close_file(&self, path: &Path) -> bool {
        let mut inner = self.inner.lock();
        inner.last_request.remove(path);
        inner.tracker.close_file(path)
    }

    pub fn marks(&self, path: &Path) -> Vec<MarkedLine> {
        self.inner.lock().tracker.marks(path).to_vec()
    }

    pub fn pending_edits(&self, path: &Path) -> Vec<EditRecord> {
        self.inner.lock().tracker.pending_edits(path).to_vec()
    }

    pub fn should_request_diff(&self, path: &Path) -> bool {
        self.inner.lock().tracker.should_request_diff(path)
    }

    /// Subscribe to mark change notifications for all files.
    pub fn subscribe(&self) -> Receiver<MarksChanged> {
        self.inner.lock().tracker.subscribe()
    }

    /// Run `f` with the side panel lifecycle.
    pub fn with_panel<R>(&self, f: impl FnOnce(&mut PanelLifecycle) -> R) -> R {
        f(&mut self.inner.lock().panel)
    }

    pub fn project_message(&self, root: &Path) -> PanelMessage {
        PanelMessage::Project(ProjectInfo {
            root: root.to_path_buf(),
            active_path: self.active_path(),
            client_id: self.client_id,
        })
    }

    pub fn marks_message(&self, path: &Path) -> PanelMessage {
        PanelMessage::Marks(MarksUpdate {
            path: path.to_path_buf(),
            marks: self.marks(path),
        })
    }

    /// Handle a palette command.
    pub async fn dispatch(&self, command: Command) -> Result<Dispatched> {
        match command {
            Command::Toggle => {
                let action = self.with_panel(|panel| {
                    let action = panel.toggle();
                    let applied = match action {
                        ToggleAction::Create => panel.begin_create().map(|_| ()),
                        ToggleAction::Reveal => {
                            panel.set_visible(true);
                            Ok(())
                        },
                        ToggleAction::Dispose => panel.dispose(),
                    };
                    applied.map(|()| action)
                })?;
                debug!(?action, "toggled panel");
                Ok(Dispatched::Panel(action))
            },
            Command::Refresh => {
                let outcome = self.refresh_active().await?;
                Ok(Dispatched::Refreshed(outcome))
            },
            other => {
                info!(command = %other, "request received");
                Ok(Dispatched::Acknowledged)
            },
        }
    }

    /// Tear down the side panel, if one is open.
    pub fn deactivate(&self) {
        self.with_panel(|panel| {
            if panel.state().is_open() {
                let _ = panel.dispose();
            }
        });
    }
}
