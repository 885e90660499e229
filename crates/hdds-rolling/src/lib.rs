// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Rolling File Writer
//!
//! Route a continuous stream of writes to time-stamped files, rolling to a
//! new file whenever a period boundary is crossed and removing files that
//! fell out of the retention window.
//!
//! # Features
//!
//! - **Six periods**: year, month, day, hour, minute, second
//! - **Lazy rotation**: checked on each write, no timer thread
//! - **Retention**: keep the last `max_backups` periods, sweep in background
//! - **Drop-in writer**: `io::Write` and `tracing_subscriber` `MakeWriter`
//!
//! # Example
//!
//! ```rust,no_run
//! use hdds_rolling::{RollPeriod, RollingConfig, RollingFileWriter};
//!
//! let config = RollingConfig::builder()
//!     .base_path("logs")
//!     .base_file_name("app.log")
//!     .period(RollPeriod::Day)
//!     .max_backups(7)
//!     .build();
//!
//! let writer = RollingFileWriter::new(config)?;
//! writer.write(b"hello\n")?;
//! writer.close()?;
//! # Ok::<(), hdds_rolling::RollingError>(())
//! ```
//!
//! # File Layout
//!
//! | Period | `app.log` rolls to |
//! |--------|--------------------|
//! | Year | `app.2026.log` |
//! | Day | `app.20261017.log` |
//! | Second | `app.20261017_13_45_31.log` |

pub mod clock;
pub mod error;
pub mod naming;
pub mod period;
pub mod policy;
pub mod retention;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RollingError;
pub use naming::FileNaming;
pub use period::RollPeriod;
pub use policy::{compute_boundary, Boundary, RotationPolicy};
pub use retention::{RetentionSweep, SweepMode, SweepReport};
pub use writer::{RollingFileWriter, WriterStats};

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Clamp a signed retention count into range; negatives keep nothing.
pub fn clamp_max_backups(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

/// Rolling writer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Directory the files are written to (created if absent).
    pub base_path: PathBuf,

    /// Base file name, split into prefix and extension at its last `.`.
    pub base_file_name: String,

    /// Number of past periods to keep.
    #[serde(
        default = "default_max_backups",
        deserialize_with = "deserialize_max_backups"
    )]
    pub max_backups: u32,

    /// Rotation granularity.
    #[serde(default)]
    pub period: RollPeriod,

    /// Expired files removed per sweep.
    #[serde(default)]
    pub sweep_mode: SweepMode,
}

fn default_max_backups() -> u32 {
    7
}

fn deserialize_max_backups<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    i64::deserialize(deserializer).map(clamp_max_backups)
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("logs"),
            base_file_name: "hdds.log".to_string(),
            max_backups: default_max_backups(),
            period: RollPeriod::Day,
            sweep_mode: SweepMode::Single,
        }
    }
}

impl RollingConfig {
    /// Create a new builder.
    pub fn builder() -> RollingConfigBuilder {
        RollingConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RollingError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, RollingError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), RollingError> {
        if self.base_path.as_os_str().is_empty() {
            return Err(RollingError::Config("base_path is empty".into()));
        }
        if self.base_file_name.is_empty() {
            return Err(RollingError::Config("base_file_name is empty".into()));
        }
        if self.base_file_name == "." || self.base_file_name == ".." {
            return Err(RollingError::Config(format!(
                "base_file_name {:?} is not a file name",
                self.base_file_name
            )));
        }
        if self.base_file_name.chars().any(std::path::is_separator) {
            return Err(RollingError::Config(format!(
                "base_file_name {:?} must not contain a path separator",
                self.base_file_name
            )));
        }
        Ok(())
    }

    /// Naming derived from the base file name.
    pub fn naming(&self) -> FileNaming {
        FileNaming::from_base_name(&self.base_file_name)
    }

    /// Rotation policy described by this configuration.
    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy::by_period(self.period, &self.base_file_name)
            .with_max_backups(self.max_backups)
    }
}

/// Builder for RollingConfig.
#[derive(Debug, Default)]
pub struct RollingConfigBuilder {
    base_path: Option<PathBuf>,
    base_file_name: Option<String>,
    max_backups: Option<u32>,
    period: Option<RollPeriod>,
    sweep_mode: Option<SweepMode>,
}

impl RollingConfigBuilder {
    /// Set the output directory.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Set the base file name (`app.log`).
    pub fn base_file_name(mut self, name: impl Into<String>) -> Self {
        self.base_file_name = Some(name.into());
        self
    }

    /// Set the number of past periods to keep. Negative counts keep none.
    pub fn max_backups(mut self, count: i64) -> Self {
        self.max_backups = Some(clamp_max_backups(count));
        self
    }

    /// Set the rotation period.
    pub fn period(mut self, period: RollPeriod) -> Self {
        self.period = Some(period);
        self
    }

    /// Set the sweep mode.
    pub fn sweep_mode(mut self, mode: SweepMode) -> Self {
        self.sweep_mode = Some(mode);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RollingConfig {
        let defaults = RollingConfig::default();

        RollingConfig {
            base_path: self.base_path.unwrap_or(defaults.base_path),
            base_file_name: self.base_file_name.unwrap_or(defaults.base_file_name),
            max_backups: self.max_backups.unwrap_or(defaults.max_backups),
            period: self.period.unwrap_or(defaults.period),
            sweep_mode: self.sweep_mode.unwrap_or(defaults.sweep_mode),
        }
    }
}
