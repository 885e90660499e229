// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Retention sweep: delete rolled files whose period fell out of the window.
//!
//! Sweeps are best effort. Every failure is logged and counted in the
//! [`SweepReport`], none is returned to the writer.

use crate::naming::FileNaming;
use crate::period::RollPeriod;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// How many expired files a single sweep removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Remove the oldest expired file, then stop.
    #[default]
    Single,
    /// Remove every expired file.
    All,
}

/// One retention pass over a directory.
#[derive(Debug, Clone)]
pub struct RetentionSweep {
    /// Directory holding the rolled files.
    pub directory: PathBuf,
    /// Naming used to recognise and decode rolled files.
    pub naming: FileNaming,
    /// Period the names were encoded with.
    pub period: RollPeriod,
    /// Number of files tolerated before anything is parsed.
    pub max_backups: u32,
    /// Files whose period starts strictly before this are removed.
    pub cutoff: DateTime<Local>,
    pub mode: SweepMode,
}

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files carrying the configured extension.
    pub candidates: usize,
    /// Sweep stopped early because `candidates <= max_backups`.
    pub short_circuited: bool,
    /// Files removed by this sweep.
    pub deleted: Vec<PathBuf>,
    /// Files whose name could not be decoded.
    pub skipped: usize,
    /// Listing or removal failures.
    pub failed: usize,
}

impl RetentionSweep {
    /// Run the sweep on the calling thread.
    pub fn run(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let candidates = match self.list_candidates(&mut report) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    dir = %self.directory.display(),
                    error = %e,
                    "Retention sweep could not list directory"
                );
                report.failed += 1;
                return report;
            }
        };

        report.candidates = candidates.len();
        if candidates.len() <= self.max_backups as usize {
            tracing::debug!(
                dir = %self.directory.display(),
                candidates = candidates.len(),
                max_backups = self.max_backups,
                "Retention sweep skipped, nothing over the limit"
            );
            report.short_circuited = true;
            return report;
        }

        for (path, name) in candidates {
            let started = match self.naming.time_of(&name, self.period, &Local) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Skipping undecodable file");
                    report.skipped += 1;
                    continue;
                }
            };

            if started >= self.cutoff {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(
                        file = %path.display(),
                        cutoff = %self.cutoff,
                        "Removed expired file"
                    );
                    report.deleted.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(file = %path.display(), "Expired file already gone");
                }
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %e,
                        "Failed to remove expired file"
                    );
                    report.failed += 1;
                }
            }

            if self.mode == SweepMode::Single {
                break;
            }
        }

        report
    }

    /// Run the sweep on a detached background thread.
    ///
    /// The returned handle may be dropped; the sweep keeps running. A panic
    /// inside the sweep is caught and logged, the handle then yields `None`.
    pub fn spawn(self) -> io::Result<JoinHandle<Option<SweepReport>>> {
        thread::Builder::new()
            .name("hdds-rolling-sweep".into())
            .spawn(move || match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
                Ok(report) => {
                    tracing::debug!(
                        dir = %self.directory.display(),
                        deleted = report.deleted.len(),
                        skipped = report.skipped,
                        failed = report.failed,
                        "Retention sweep finished"
                    );
                    Some(report)
                }
                Err(_) => {
                    tracing::error!(dir = %self.directory.display(), "Retention sweep panicked");
                    None
                }
            })
    }

    /// Entries carrying our extension, sorted by name.
    ///
    /// Sorting makes the listing order deterministic; for a fixed prefix it
    /// is also oldest first.
    fn list_candidates(&self, report: &mut SweepReport) -> io::Result<Vec<(PathBuf, String)>> {
        let mut candidates = Vec::new();

        for entry in fs::read_dir(&self.directory)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !self.naming.has_extension(&name) {
                continue;
            }

            let path = entry.path();
            if is_dir(&path) {
                continue;
            }
            candidates.push((path, name));
        }

        candidates.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(candidates)
    }
}

fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
