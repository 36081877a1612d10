//! Palette commands contributed to the host editor.
//!
//! The host identifies commands by string ids such as `CΩ.toggle`. They are
//! parsed into [`Command`] at the boundary so the rest of the session only
//! deals with a closed set of kinds.

use std::{fmt, str::FromStr};
use thiserror::Error;

/// Prefix shared by every command id.
pub const COMMAND_PREFIX: &str = "CΩ.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Show, reveal or dispose the side panel
    Toggle,
    Highlight,
    NextContributor,
    PrevContributor,
    NextContribution,
    PrevContribution,
    MergeSlice,
    MergeAll,
    OpenPeerFile,
    OpenDiff,
    /// Request a fresh diff for the active file
    Refresh,
    OpenFile,
    SelectRange,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::Toggle,
        Command::Highlight,
        Command::NextContributor,
        Command::PrevContributor,
        Command::NextContribution,
        Command::PrevContribution,
        Command::MergeSlice,
        Command::MergeAll,
        Command::OpenPeerFile,
        Command::OpenDiff,
        Command::Refresh,
        Command::OpenFile,
        Command::SelectRange,
    ];

    /// Id without the [`COMMAND_PREFIX`].
    pub fn name(self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::Highlight => "highlight",
            Command::NextContributor => "nextContributor",
            Command::PrevContributor => "prevContributor",
            Command::NextContribution => "nextContribution",
            Command::PrevContribution => "prevContribution",
            Command::MergeSlice => "mergeSlice",
            Command::MergeAll => "mergeAll",
            Command::OpenPeerFile => "openPeerFile",
            Command::OpenDiff => "openDiff",
            Command::Refresh => "refresh",
            Command::OpenFile => "openFile",
            Command::SelectRange => "selectRange",
        }
    }

    /// Full id as registered with the host.
    pub fn id(self) -> String {
        format!("{COMMAND_PREFIX}{}", self.name())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_PREFIX}{}", self.name())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let name = id
            .strip_prefix(COMMAND_PREFIX)
            .ok_or_else(|| CommandError::Unknown(id.to_string()))?;

        Command::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| CommandError::Unknown(id.to_string()))
    }
}
