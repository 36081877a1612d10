//! Replay a recorded host event stream through a [`Session`].
//!
//! Each line of the input is one JSON [`ReplayEvent`]:
//!
//! ```text
//! {"kind":"edit","path":"/repo/a.rs","changes":[{"start_line":3,"end_line":3,"inserted_text":"\n"}]}
//! {"kind":"request","path":"/repo/a.rs","id":1}
//! {"kind":"diff","path":"/repo/a.rs","request":1,"marks":[{"line":4,"length":2}]}
//! {"kind":"close","path":"/repo/a.rs"}
//! {"kind":"command","id":"CΩ.toggle"}
//! ```
//!
//! Diff results are taken from the stream, never fetched, so the replay is
//! deterministic. `id` labels a request within the recording and `diff`
//! events refer back to it.

use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use caw_session::{Command, Config, DiffOutcome, PeerDiffProvider, Session};
use caw_tracker::{HostChange, MarkedLine, RequestSeq};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReplayEvent {
    Edit {
        path: PathBuf,
        changes: Vec<HostChange>,
    },
    Request {
        path: PathBuf,
        id: u64,
    },
    Diff {
        path: PathBuf,
        request: u64,
        marks: Vec<MarkedLine>,
    },
    Close {
        path: PathBuf,
    },
    Command {
        id: String,
    },
}

/// Final state after a replay.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Marks of every file the stream touched, keyed by path
    pub files: BTreeMap<PathBuf, Vec<MarkedLine>>,
    pub applied: usize,
    pub stale: usize,
    pub rejected: usize,
    /// Requests the session refused to issue
    pub skipped: usize,
}

impl ReplayReport {
    fn record(&mut self, outcome: DiffOutcome) {
        match outcome {
            DiffOutcome::Applied => self.applied += 1,
            DiffOutcome::Stale => self.stale += 1,
            DiffOutcome::Rejected => self.rejected += 1,
            DiffOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Diffs come from the recording; a replay never reaches a peer service.
struct RecordedDiffs;

#[async_trait]
impl PeerDiffProvider for RecordedDiffs {
    async fn fetch_diff(&self, path: &Path) -> Result<Vec<MarkedLine>> {
        Err(anyhow!(
            "no peer service during replay, record a diff event for {}",
            path.display()
        ))
    }
}

pub async fn handle(events: &Path, config_path: Option<&Path>) -> Result<()> {
    let discovered = events
        .parent()
        .and_then(caw_session::discover);
    let config = Config::load_with_overrides(config_path, discovered.as_deref())?;

    let file = File::open(events)
        .with_context(|| format!("Failed to open event stream: {}", events.display()))?;
    let report = replay(BufReader::new(file), config).await?;

    let output = serde_json::to_string_pretty(&report).context("Failed to encode replay report")?;
    println!("{output}");
    Ok(())
}

/// Feed every event of `reader` to a fresh session.
///
/// Requests are never throttled during a replay; recorded timing is not kept.
pub async fn replay(reader: impl BufRead, mut config: Config) -> Result<ReplayReport> {
    config.sync_threshold_ms = 0;
    let session = Session::new(config, Arc::new(RecordedDiffs));

    let mut requests: HashMap<u64, Option<RequestSeq>> = HashMap::new();
    let mut report = ReplayReport::default();
    let mut touched = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read event on line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let event: ReplayEvent = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event on line {line_number}"))?;
        tracing::trace!(line_number, ?event, "replaying event");

        match event {
            ReplayEvent::Edit { path, changes } => {
                session.on_document_change(&path, &changes);
                touched.push(path);
            },
            ReplayEvent::Request { path, id } => {
                let seq = session.begin_diff_request(&path);
                if seq.is_none() {
                    report.record(DiffOutcome::Skipped);
                }
                if requests.insert(id, seq).is_some() {
                    bail!("request id {id} reused on line {line_number}");
                }
                touched.push(path);
            },
            ReplayEvent::Diff {
                path,
                request,
                marks,
            } => {
                let seq = requests
                    .get(&request)
                    .with_context(|| format!("unknown request id {request} on line {line_number}"))?;
                // A diff for a request that was never issued cannot match anything
                let outcome = match seq {
                    Some(seq) => session.on_diff_result(&path, *seq, marks),
                    None => DiffOutcome::Stale,
                };
                report.record(outcome);
                touched.push(path);
            },
            ReplayEvent::Close { path } => {
                session.close_file(&path);
                touched.push(path);
            },
            ReplayEvent::Command { id } => {
                let command: Command = id
                    .parse()
                    .with_context(|| format!("Invalid command on line {line_number}"))?;
                if let Err(err) = session.dispatch(command).await {
                    tracing::warn!(line_number, "command {command} failed: {err:#}");
                }
            },
        }
    }

    for path in touched {
        let marks = session.marks(&path);
        report.files.insert(path, marks);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(lines: &[&str]) -> Result<ReplayReport> {
        replay(lines.join("\n").as_bytes(), Config::default()).await
    }

    #[tokio::test]
    async fn edits_shift_reconciled_marks() {
        let report = run(&[
            r#"{"kind":"request","path":"/repo/a.rs","id":1}"#,
            r#"{"kind":"diff","path":"/repo/a.rs","request":1,"marks":[{"line":4,"length":2}]}"#,
            r#"{"kind":"edit","path":"/repo/a.rs","changes":[{"start_line":0,"end_line":0,"inserted_text":"\n\n"}]}"#,
        ])
        .await
        .unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(
            report.files[Path::new("/repo/a.rs")],
            vec![MarkedLine::new(6, 2)]
        );
    }

    #[tokio::test]
    async fn results_from_before_close_are_stale() {
        let report = run(&[
            r#"{"kind":"request","path":"/repo/a.rs","id":1}"#,
            r#"{"kind":"close","path":"/repo/a.rs"}"#,
            r#"{"kind":"request","path":"/repo/a.rs","id":2}"#,
            r#"{"kind":"request","path":"/repo/a.rs","id":3}"#,
            r#"{"kind":"diff","path":"/repo/a.rs","request":1,"marks":[{"line":1,"length":1}]}"#,
            r#"{"kind":"diff","path":"/repo/a.rs","request":3,"marks":[{"line":2,"length":1}]}"#,
            r#"{"kind":"diff","path":"/repo/a.rs","request":2,"marks":[{"line":3,"length":1}]}"#,
        ])
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.stale, 2);
        assert_eq!(report.applied, 1);
        assert_eq!(
            report.files[Path::new("/repo/a.rs")],
            vec![MarkedLine::new(3, 1)]
        );
    }

    #[tokio::test]
    async fn closing_forgets_marks() {
        let report = run(&[
            r#"{"kind":"request","path":"/repo/a.rs","id":1}"#,
            r#"{"kind":"diff","path":"/repo/a.rs","request":1,"marks":[{"line":1,"length":1}]}"#,
            r#"{"kind":"close","path":"/repo/a.rs"}"#,
        ])
        .await
        .unwrap();

        assert!(report.files[Path::new("/repo/a.rs")].is_empty());
    }

    #[tokio::test]
    async fn blank_lines_and_commands_are_accepted() {
        let report = run(&["", r#"{"kind":"command","id":"CΩ.toggle"}"#, "  "])
            .await
            .unwrap();

        assert_eq!(report, ReplayReport::default());
    }

    #[tokio::test]
    async fn reports_line_of_bad_event() {
        let err = run(&[r#"{"kind":"close","path":"/a"}"#, r#"{"kind":"teleport"}"#])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid event on line 2");
    }

    #[tokio::test]
    async fn unknown_request_id_is_an_error() {
        let err = run(&[r#"{"kind":"diff","path":"/a","request":9,"marks":[]}"#])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown request id 9"));
    }
}
