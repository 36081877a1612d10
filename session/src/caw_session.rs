//! Editor integration for Code Awareness line marks.
//!
//! A [`Session`] sits between the host editor and the [`caw_tracker`] core:
//!
//! ```text
//! host change events --> Session::on_document_change --> LineMapTracker::apply_edit
//! sync loop / CΩ.refresh --> Session::refresh_diff --> PeerDiffProvider::fetch_diff
//!                                                   --> Session::on_diff_result
//! ```
//!
//! - [`Config`] - sync interval, request throttle and line ending handling
//! - [`Command`] - the palette commands contributed to the host
//! - [`PanelLifecycle`] / [`PanelMessage`] - side panel state and the messages posted to it

pub mod command;
pub mod config;
pub mod panel;
pub mod protocol;
pub mod provider;
pub mod session;

// Make test utilities available for both unit and integration tests
#[cfg(any(test, feature = "test-support"))]
pub mod test;

pub use command::{Command, CommandError, COMMAND_PREFIX};
pub use config::{discover, Config};
pub use panel::{PanelError, PanelLifecycle, PanelState, ToggleAction};
pub use protocol::{DiffBlock, MarksUpdate, PanelMessage, ProjectInfo};
pub use provider::PeerDiffProvider;
pub use session::{DiffOutcome, Dispatched, Session};
