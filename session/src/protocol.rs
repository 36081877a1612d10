//! Messages posted from the session to the side panel webview.
//!
//! Every message is serialized as `{"command": "<kind>", "data": {...}}`,
//! the envelope the panel app listens for.

use caw_tracker::MarkedLine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data")]
pub enum PanelMessage {
    /// The active project or file changed
    #[serde(rename = "repo:project")]
    Project(ProjectInfo),
    /// A peer's change block was selected in the editor
    #[serde(rename = "peer:select")]
    SelectPeer(DiffBlock),
    /// The marks of a file changed
    #[serde(rename = "marks:update")]
    Marks(MarksUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub root: PathBuf,
    pub active_path: Option<PathBuf>,
    /// Identifies this editor instance to the service
    pub client_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffBlock {
    pub path: PathBuf,
    pub peer: String,
    pub range: MarkedLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksUpdate {
    pub path: PathBuf,
    pub marks: Vec<MarkedLine>,
}
