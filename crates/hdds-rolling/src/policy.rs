// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rotation policy: when to roll next, what to call the new file, and
//! which older files fall out of retention.
//!
//! Everything here is pure. The writer feeds it the current time and acts
//! on the resulting [`Boundary`].

use crate::error::RollingError;
use crate::naming::FileNaming;
use crate::period::RollPeriod;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::fmt::Display;

/// Outcome of a rotation decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary<Tz: TimeZone> {
    /// First instant at which the next rotation is due.
    pub next_check: DateTime<Tz>,

    /// Files whose encoded period starts strictly before this are expired.
    pub retention_cutoff: DateTime<Tz>,

    /// Name of the file for the period containing `now`.
    pub file_name: String,
}

/// Compute the rotation boundary for `now`.
///
/// `retention_count` periods are kept behind the next boundary; a count of
/// zero puts the cutoff on the boundary itself. A window reaching past the
/// calendar range saturates to [`earliest_cutoff`], which keeps everything.
pub fn compute_boundary<Tz>(
    now: &DateTime<Tz>,
    period: RollPeriod,
    retention_count: u32,
    naming: &FileNaming,
) -> Result<Boundary<Tz>, RollingError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let next_check = period.next_boundary(now)?;
    let retention_cutoff = match period.shift(&next_check, -i64::from(retention_count)) {
        Err(RollingError::TimeOutOfRange) => earliest_cutoff(&next_check.timezone()),
        other => other?,
    };
    let file_name = naming.name_for(period, now);

    Ok(Boundary {
        next_check,
        retention_cutoff,
        file_name,
    })
}

/// Earliest cutoff representable in `tz`.
///
/// One day of margin past chrono's minimum keeps the local wall time
/// in range for any offset.
pub fn earliest_cutoff<Tz: TimeZone>(tz: &Tz) -> DateTime<Tz> {
    (DateTime::<Utc>::MIN_UTC + TimeDelta::days(1)).with_timezone(tz)
}

/// Rotation policy configuration.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Granularity of rotation.
    pub period: RollPeriod,

    /// Number of past periods to keep.
    pub max_backups: u32,

    /// Prefix and extension of rolled files.
    pub naming: FileNaming,
}

impl RotationPolicy {
    /// Create a policy rolling every `period`, keeping no history.
    pub fn by_period(period: RollPeriod, base_file_name: &str) -> Self {
        Self {
            period,
            max_backups: 0,
            naming: FileNaming::from_base_name(base_file_name),
        }
    }

    /// Set the number of past periods to keep.
    pub fn with_max_backups(mut self, max: u32) -> Self {
        self.max_backups = max;
        self
    }

    /// Boundary for `now` under this policy.
    pub fn compute<Tz>(&self, now: &DateTime<Tz>) -> Result<Boundary<Tz>, RollingError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        compute_boundary(now, self.period, self.max_backups, &self.naming)
    }
}
