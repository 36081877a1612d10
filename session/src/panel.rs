//! Side panel lifecycle.
//!
//! The host owns the actual webview; this module only sequences it:
//!
//! ```text
//! Closed --> Creating --> ContentLoading --> Ready --> Disposed
//!               ^                                         |
//!               +-----------------------------------------+
//! ```
//!
//! Each time the panel is created it gets a fresh [`CancellationToken`].
//! Disposing cancels it, which stops any content loading or message pumping
//! still running for that panel.

use crate::PanelMessage;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Creating,
    ContentLoading,
    Ready,
    Disposed,
}

impl PanelState {
    /// Whether a webview exists for this state.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            PanelState::Creating | PanelState::ContentLoading | PanelState::Ready
        )
    }
}

/// What toggling the panel should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// No panel exists; create one
    Create,
    /// The panel exists but is hidden behind other editors
    Reveal,
    /// The panel is visible; close it
    Dispose,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error("panel cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: PanelState, to: PanelState },

    #[error("failed to encode panel message: {0}")]
    Encode(String),
}

#[derive(Debug)]
pub struct PanelLifecycle {
    state: PanelState,
    visible: bool,
    cancel: CancellationToken,
}

impl Default for PanelLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelLifecycle {
    pub fn new() -> Self {
        Self {
            state: PanelState::Closed,
            visible: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Record a visibility change reported by the host.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible && self.state.is_open();
    }

    /// Token cancelled when the current panel is disposed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Decide what the toggle command does in the current state.
    pub fn toggle(&self) -> ToggleAction {
        match (self.state.is_open(), self.visible) {
            (true, false) => ToggleAction::Reveal,
            (true, true) => ToggleAction::Dispose,
            (false, _) => ToggleAction::Create,
        }
    }

    /// Start creating a panel. Returns the token for the new panel's tasks.
    pub fn begin_create(&mut self) -> Result<CancellationToken, PanelError> {
        self.transition(
            &[PanelState::Closed, PanelState::Disposed],
            PanelState::Creating,
        )?;
        self.cancel = CancellationToken::new();
        self.visible = true;
        Ok(self.cancel.clone())
    }

    /// The webview exists and its content started loading.
    pub fn begin_loading(&mut self) -> Result<(), PanelError> {
        self.transition(&[PanelState::Creating], PanelState::ContentLoading)
    }

    /// The panel app finished loading and accepts messages.
    pub fn content_ready(&mut self) -> Result<(), PanelError> {
        self.transition(&[PanelState::ContentLoading], PanelState::Ready)
    }

    /// Close the panel and cancel everything tied to it.
    pub fn dispose(&mut self) -> Result<(), PanelError> {
        self.transition(
            &[
                PanelState::Creating,
                PanelState::ContentLoading,
                PanelState::Ready,
            ],
            PanelState::Disposed,
        )?;
        self.cancel.cancel();
        self.visible = false;
        Ok(())
    }

    /// Serialize `message` for the webview.
    ///
    /// Returns `None` unless the panel is ready; messages for a panel that is
    /// not there are dropped.
    pub fn encode_message(&self, message: &PanelMessage) -> Result<Option<String>, PanelError> {
        if self.state != PanelState::Ready {
            tracing::trace!(state = ?self.state, "dropping panel message");
            return Ok(None);
        }
        serde_json::to_string(message)
            .map(Some)
            .map_err(|e| PanelError::Encode(e.to_string()))
    }

    fn transition(&mut self, from: &[PanelState], to: PanelState) -> Result<(), PanelError> {
        if !from.contains(&self.state) {
            return Err(PanelError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = ?self.state, ?to, "panel transition");
        self.state = to;
        Ok(())
    }
}
