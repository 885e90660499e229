// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-rolling file writer.
//!
//! One mutex guards the open file and the rotation boundaries, so the
//! check-rotate-write sequence is atomic with respect to other writers.
//! Rotation is checked lazily on each write: after an idle stretch the
//! first write rolls using the time it observes, not the boundary that
//! passed while idle.

use crate::clock::{Clock, SystemClock};
use crate::error::RollingError;
use crate::period::RollPeriod;
use crate::policy::RotationPolicy;
use crate::retention::RetentionSweep;
use crate::RollingConfig;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::MakeWriter;

/// Writer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// Successful writes.
    pub writes: u64,

    /// Bytes written across all files.
    pub bytes_written: u64,

    /// Successful rotations, including the one done at construction.
    pub rotations: u64,

    /// Rotations that failed to open the next file.
    pub failed_rotations: u64,
}

/// State guarded by the writer lock.
#[derive(Debug, Default)]
struct RotatorState {
    file: Option<File>,
    current_path: Option<PathBuf>,
    next_check: Option<DateTime<Local>>,
    retention_cutoff: Option<DateTime<Local>>,
    closed: bool,
    stats: WriterStats,
}

/// A completed rotation, acted on once the lock is released.
struct Rolled {
    path: PathBuf,
    next_check: DateTime<Local>,
    sweep: RetentionSweep,
}

/// Writer that rolls to a new file at every period boundary.
pub struct RollingFileWriter<C: Clock = SystemClock> {
    config: RollingConfig,
    policy: RotationPolicy,
    clock: C,
    state: Mutex<RotatorState>,
}

impl RollingFileWriter<SystemClock> {
    /// Create a writer on the system clock and open the first file.
    pub fn new(config: RollingConfig) -> Result<Self, RollingError> {
        Self::with_clock(config, SystemClock)
    }

    /// Shorthand for the common parameters. Negative `max_backups` keep none.
    pub fn open(
        base_path: impl Into<PathBuf>,
        base_file_name: impl Into<String>,
        max_backups: i64,
        period: RollPeriod,
    ) -> Result<Self, RollingError> {
        let config = RollingConfig::builder()
            .base_path(base_path)
            .base_file_name(base_file_name)
            .max_backups(max_backups)
            .period(period)
            .build();
        Self::new(config)
    }
}

impl<C: Clock> RollingFileWriter<C> {
    /// Create a writer driven by `clock` and open the first file.
    pub fn with_clock(config: RollingConfig, clock: C) -> Result<Self, RollingError> {
        config.validate()?;
        create_dir(&config.base_path)?;

        let writer = Self {
            policy: config.policy(),
            config,
            clock,
            state: Mutex::new(RotatorState::default()),
        };

        let rolled = {
            let mut state = writer.state.lock();
            writer.rotate_if_due(&mut state)
        };
        let rolled = rolled.map_err(|e| writer.rotation_failed(e))?;
        writer.finish_rotation(rolled);

        Ok(writer)
    }

    /// Append `buf` to the current file, rolling first if a boundary passed.
    pub fn write(&self, buf: &[u8]) -> Result<usize, RollingError> {
        let (rolled, written) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RollingError::Closed);
            }

            let rolled = match self.rotate_if_due(&mut state) {
                Ok(rolled) => rolled,
                Err(e) => {
                    drop(state);
                    return Err(self.rotation_failed(e));
                }
            };
            let written = match state.file.as_mut() {
                Some(file) => file.write_all(buf).map_err(RollingError::from),
                None => Err(RollingError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no active file",
                ))),
            };
            if written.is_ok() {
                state.stats.writes += 1;
                state.stats.bytes_written += buf.len() as u64;
            }
            (rolled, written)
        };

        // Logging and sweeping happen outside the lock: a tracing subscriber
        // backed by this writer would otherwise re-enter it.
        self.finish_rotation(rolled);

        written.map(|()| buf.len())
    }

    /// Flush the current file.
    pub fn flush(&self) -> Result<(), RollingError> {
        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// Sync and release the current file. Later writes fail with
    /// [`RollingError::Closed`]; closing twice is a no-op.
    pub fn close(&self) -> Result<(), RollingError> {
        let (file, path) = {
            let mut state = self.state.lock();
            state.closed = true;
            (state.file.take(), state.current_path.clone())
        };

        if let Some(file) = file {
            file.sync_all()?;
            if let Some(path) = path {
                tracing::debug!(path = %path.display(), "Closed rolled file");
            }
        }
        Ok(())
    }

    /// Roll to the file for the current period if the boundary was reached.
    ///
    /// On failure the writer is left without a file and the old boundary
    /// stays in place, so the next write retries. Must not log: the caller
    /// holds the lock.
    fn rotate_if_due(&self, state: &mut RotatorState) -> Result<Option<Rolled>, RollingError> {
        let now = self.clock.now();
        if let Some(next) = &state.next_check {
            if now < *next {
                return Ok(None);
            }
        }

        // Release the previous handle before anything can fail.
        drop(state.file.take());

        let boundary = match self.policy.compute(&now) {
            Ok(boundary) => boundary,
            Err(e) => {
                state.stats.failed_rotations += 1;
                return Err(e);
            }
        };

        let path = self.config.base_path.join(&boundary.file_name);
        let file = match open_append(&path) {
            Ok(file) => file,
            Err(e) => {
                state.stats.failed_rotations += 1;
                return Err(RollingError::Io(io::Error::new(
                    e.kind(),
                    format!("{}: {}", path.display(), e),
                )));
            }
        };

        state.file = Some(file);
        state.current_path = Some(path.clone());
        state.next_check = Some(boundary.next_check);
        state.retention_cutoff = Some(boundary.retention_cutoff);
        state.stats.rotations += 1;

        Ok(Some(Rolled {
            path,
            next_check: boundary.next_check,
            sweep: RetentionSweep {
                directory: self.config.base_path.clone(),
                naming: self.policy.naming.clone(),
                period: self.policy.period,
                max_backups: self.policy.max_backups,
                cutoff: boundary.retention_cutoff,
                mode: self.config.sweep_mode,
            },
        }))
    }

    /// Log a failed rotation and hand the error back. Runs without the lock.
    fn rotation_failed(&self, e: RollingError) -> RollingError {
        tracing::warn!(
            dir = %self.config.base_path.display(),
            error = %e,
            "Rotation failed, retrying on next write"
        );
        e
    }

    /// Log a rotation and start its retention sweep. Runs without the lock.
    fn finish_rotation(&self, rolled: Option<Rolled>) {
        let Some(rolled) = rolled else {
            return;
        };

        tracing::info!(
            path = %rolled.path.display(),
            next_rotation = %rolled.next_check,
            "Rolled to new file"
        );

        let dir = rolled.sweep.directory.clone();
        if let Err(e) = rolled.sweep.spawn() {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to spawn retention sweep");
        }
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current_path.clone()
    }

    /// Instant at or after which the next write rolls.
    pub fn next_rotation(&self) -> Option<DateTime<Local>> {
        self.state.lock().next_check
    }

    /// Files encoding a period before this are eligible for removal.
    pub fn retention_cutoff(&self) -> Option<DateTime<Local>> {
        self.state.lock().retention_cutoff
    }

    /// True once [`RollingFileWriter::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Snapshot of the writer statistics.
    pub fn stats(&self) -> WriterStats {
        self.state.lock().stats.clone()
    }

    /// Get configuration.
    pub fn config(&self) -> &RollingConfig {
        &self.config
    }
}

impl<C: Clock> io::Write for &RollingFileWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RollingFileWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RollingFileWriter::flush(*self).map_err(io::Error::from)
    }
}

impl<C: Clock> io::Write for RollingFileWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RollingFileWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RollingFileWriter::flush(self).map_err(io::Error::from)
    }
}

impl<'a, C: Clock + 'a> MakeWriter<'a> for RollingFileWriter<C> {
    type Writer = &'a RollingFileWriter<C>;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

impl<C: Clock> std::fmt::Debug for RollingFileWriter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFileWriter")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}

fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn config(dir: &Path, period: RollPeriod, max_backups: i64) -> RollingConfig {
        RollingConfig::builder()
            .base_path(dir)
            .base_file_name("app.log")
            .period(period)
            .max_backups(max_backups)
            .build()
    }

    #[test]
    fn test_construction_opens_first_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        let clock = ManualClock::new(noon(2026, 4, 10));

        let writer = RollingFileWriter::with_clock(config(&dir, RollPeriod::Day, 2), clock).unwrap();

        let path = writer.current_path().unwrap();
        assert_eq!(path, dir.join("app.20260410.log"));
        assert!(path.exists());
        assert_eq!(
            writer.next_rotation().unwrap(),
            Local.with_ymd_and_hms(2026, 4, 11, 0, 0, 0).unwrap()
        );
        assert_eq!(
            writer.retention_cutoff().unwrap(),
            Local.with_ymd_and_hms(2026, 4, 9, 0, 0, 0).unwrap()
        );
        assert_eq!(writer.stats().rotations, 1);
    }

    #[test]
    fn test_writes_before_boundary_share_a_file() {
        let tmp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(noon(2026, 4, 10)));
        let writer =
            RollingFileWriter::with_clock(config(tmp.path(), RollPeriod::Day, 2), Arc::clone(&clock))
                .unwrap();

        assert_eq!(writer.write(b"one\n").unwrap(), 4);
        clock.advance(TimeDelta::hours(6));
        assert_eq!(writer.write(b"two\n").unwrap(), 4);

        let content = fs::read_to_string(tmp.path().join("app.20260410.log")).unwrap();
        assert_eq!(content, "one\ntwo\n");
        assert_eq!(writer.stats().rotations, 1);
        assert_eq!(writer.stats().bytes_written, 8);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_writes() {
        let tmp = TempDir::new().unwrap();
        let writer = RollingFileWriter::with_clock(
            config(tmp.path(), RollPeriod::Hour, 1),
            ManualClock::new(noon(2026, 4, 10)),
        )
        .unwrap();

        writer.write(b"data").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert!(matches!(writer.write(b"late"), Err(RollingError::Closed)));
        let content = fs::read_to_string(tmp.path().join("app.20260410_12.log")).unwrap();
        assert_eq!(content, "data");
    }

    #[test]
    fn test_rotation_failure_is_retried_on_next_write() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("logs");
        let clock = Arc::new(ManualClock::new(noon(2026, 4, 10)));
        let writer =
            RollingFileWriter::with_clock(config(&dir, RollPeriod::Day, 5), Arc::clone(&clock))
                .unwrap();
        writer.write(b"day one\n").unwrap();

        // Replace the directory with a plain file so the next open fails.
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, b"blocker").unwrap();
        clock.advance(TimeDelta::days(1));

        assert!(matches!(writer.write(b"lost\n"), Err(RollingError::Io(_))));
        assert_eq!(writer.stats().failed_rotations, 1);
        assert_eq!(writer.stats().writes, 1);
        assert_eq!(writer.current_path().unwrap(), dir.join("app.20260410.log"));

        // Still due: the failed attempt left the old boundary in place.
        assert!(matches!(writer.write(b"lost\n"), Err(RollingError::Io(_))));
        assert_eq!(writer.stats().failed_rotations, 2);
        assert_eq!(writer.stats().bytes_written, 8);

        fs::remove_file(&dir).unwrap();
        fs::create_dir(&dir).unwrap();

        writer.write(b"day two\n").unwrap();
        let content = fs::read_to_string(dir.join("app.20260411.log")).unwrap();
        assert_eq!(content, "day two\n");
        assert_eq!(writer.stats().rotations, 2);
    }

    #[test]
    fn test_construction_fails_when_directory_cannot_be_created() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let err = RollingFileWriter::with_clock(
            config(&blocker.join("logs"), RollPeriod::Day, 1),
            ManualClock::new(noon(2026, 4, 10)),
        )
        .unwrap_err();
        assert!(matches!(err, RollingError::Io(_)));
    }

    #[test]
    fn test_construction_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let config = RollingConfig::builder()
            .base_path(tmp.path())
            .base_file_name("a/b.log")
            .build();

        assert!(matches!(
            RollingFileWriter::new(config),
            Err(RollingError::Config(_))
        ));
    }

    #[test]
    fn test_io_write_impl() {
        let tmp = TempDir::new().unwrap();
        let mut writer = RollingFileWriter::with_clock(
            config(tmp.path(), RollPeriod::Month, 0),
            ManualClock::new(noon(2026, 4, 10)),
        )
        .unwrap();

        writeln!(writer, "formatted {}", 42).unwrap();
        io::Write::flush(&mut writer).unwrap();

        let content = fs::read_to_string(tmp.path().join("app.202604.log")).unwrap();
        assert_eq!(content, "formatted 42\n");
    }

    #[test]
    fn test_io_write_after_close_maps_error() {
        let tmp = TempDir::new().unwrap();
        let writer = RollingFileWriter::with_clock(
            config(tmp.path(), RollPeriod::Year, 0),
            ManualClock::new(noon(2026, 4, 10)),
        )
        .unwrap();
        writer.close().unwrap();

        let err = (&writer).write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_make_writer_backs_tracing_subscriber() {
        let tmp = TempDir::new().unwrap();
        let writer = RollingFileWriter::with_clock(
            config(tmp.path(), RollPeriod::Day, 0),
            ManualClock::new(noon(2026, 4, 10)),
        )
        .unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(answer = 42, "through the rolling writer");
        });

        let content = fs::read_to_string(tmp.path().join("app.20260410.log")).unwrap();
        assert!(content.contains("through the rolling writer"));
        assert!(content.contains("answer=42"));
    }
}
