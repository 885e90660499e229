// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rolled file names: `<prefix>.<encoded-timestamp><extension>`.
//!
//! | Period | Example name |
//! |--------|--------------|
//! | Year | `app.2026.log` |
//! | Month | `app.202610.log` |
//! | Day | `app.20261017.log` |
//! | Hour | `app.20261017_13.log` |
//! | Minute | `app.20261017_13_45.log` |
//! | Second | `app.20261017_13_45_31.log` |

use crate::error::RollingError;
use crate::period::{resolve_local, RollPeriod};
use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Full-resolution layout every encoded timestamp is padded up to before parsing.
const FULL_LAYOUT: &str = "%Y%m%d_%H_%M_%S";

/// Prefix and extension of rolled files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNaming {
    prefix: String,
    extension: String,
}

impl FileNaming {
    /// Build from explicit parts. `extension` keeps its leading dot.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Split a base file name at its last `.`: `app.log` gives `app` + `.log`.
    pub fn from_base_name(base_file_name: &str) -> Self {
        match base_file_name.rfind('.') {
            Some(idx) => Self::new(&base_file_name[..idx], &base_file_name[idx..]),
            None => Self::new(base_file_name, ""),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True if `file_name` carries our extension (the listing filter).
    pub fn has_extension(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.extension)
    }

    /// File name for the period of `period` containing `at`.
    pub fn name_for<Tz>(&self, period: RollPeriod, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!(
            "{}.{}{}",
            self.prefix,
            at.format(period.format()),
            self.extension
        )
    }

    /// Inverse of [`FileNaming::name_for`]: start of the period encoded in `file_name`.
    pub fn time_of<Tz: TimeZone>(
        &self,
        file_name: &str,
        period: RollPeriod,
        tz: &Tz,
    ) -> Result<DateTime<Tz>, RollingError> {
        let stem = file_name
            .strip_suffix(self.extension.as_str())
            .ok_or_else(|| RollingError::invalid_name(file_name, "extension mismatch"))?;
        let encoded = stem
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| RollingError::invalid_name(file_name, "prefix mismatch"))?;

        let naive = decode(period, encoded)
            .map_err(|reason| RollingError::invalid_name(file_name, reason))?;
        resolve_local(tz, naive)
    }
}

/// Parse an encoded timestamp at the resolution of `period`.
fn decode(period: RollPeriod, encoded: &str) -> Result<NaiveDateTime, String> {
    if encoded.len() != period.encoded_len() {
        return Err(format!(
            "expected {} characters for {} layout {:?}, got {}",
            period.encoded_len(),
            period,
            period.format(),
            encoded.len()
        ));
    }

    // Underscores sit at fixed offsets in every layout that has a time part.
    let well_formed = encoded.bytes().enumerate().all(|(i, b)| match i {
        8 | 11 | 14 => b == b'_',
        _ => b.is_ascii_digit(),
    });
    if !well_formed {
        return Err(format!("{:?} does not match layout {:?}", encoded, period.format()));
    }

    let padded = format!("{}{}", encoded, period.parse_padding());
    NaiveDateTime::parse_from_str(&padded, FULL_LAYOUT).map_err(|e| e.to_string())
}
