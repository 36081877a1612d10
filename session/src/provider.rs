//! Seam to the remote peer-diff service.
//!
//! The [`PeerDiffProvider`] trait lets production code talk to the Code
//! Awareness service while tests use
//! [`MockDiffProvider`](crate::test::MockDiffProvider).

use anyhow::Result;
use async_trait::async_trait;
use caw_tracker::MarkedLine;
use std::path::Path;

/// Computes authoritative peer marks for a file.
#[async_trait]
pub trait PeerDiffProvider: Send + Sync {
    /// Diff `path` against the peers' revisions.
    ///
    /// The result must describe the buffer as it was when the request was
    /// issued, sorted by line and without overlapping marks.
    async fn fetch_diff(&self, path: &Path) -> Result<Vec<MarkedLine>>;
}
