// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rolling periods and the calendar arithmetic behind them.
//!
//! Year, month and day periods move along the wall-clock calendar of the
//! time zone they are evaluated in. Hour, minute and second periods are
//! truncated on the wall clock and then advanced by an absolute duration.

use crate::error::RollingError;
use chrono::{
    DateTime, Datelike, Days, LocalResult, Months, NaiveDate, NaiveDateTime, Offset, TimeDelta,
    TimeZone, Timelike,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Granularity at which files are rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RollPeriod {
    Year,
    Month,
    #[default]
    Day,
    Hour,
    Minute,
    Second,
}

impl RollPeriod {
    /// Every supported period, coarsest first.
    pub const ALL: [RollPeriod; 6] = [
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// Canonical token (`"DAY"`, `"HOUR"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }

    /// `strftime` pattern used to encode a period into a file name.
    pub fn format(&self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%Y%m",
            Self::Day => "%Y%m%d",
            Self::Hour => "%Y%m%d_%H",
            Self::Minute => "%Y%m%d_%H_%M",
            Self::Second => "%Y%m%d_%H_%M_%S",
        }
    }

    /// Exact length of an encoded timestamp (4-digit years).
    pub(crate) fn encoded_len(&self) -> usize {
        match self {
            Self::Year => 4,
            Self::Month => 6,
            Self::Day => 8,
            Self::Hour => 11,
            Self::Minute => 14,
            Self::Second => 17,
        }
    }

    /// Suffix that completes an encoded timestamp to `%Y%m%d_%H_%M_%S`.
    pub(crate) fn parse_padding(&self) -> &'static str {
        match self {
            Self::Year => "0101_00_00_00",
            Self::Month => "01_00_00_00",
            Self::Day => "_00_00_00",
            Self::Hour => "_00_00",
            Self::Minute => "_00",
            Self::Second => "",
        }
    }

    /// Fixed length in seconds for sub-day periods, `None` for calendar periods.
    fn fixed_secs(&self) -> Option<i64> {
        match self {
            Self::Year | Self::Month | Self::Day => None,
            Self::Hour => Some(3600),
            Self::Minute => Some(60),
            Self::Second => Some(1),
        }
    }

    /// Truncate a wall-clock time to the start of its period.
    pub(crate) fn truncate_naive(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        let d = t.date();
        match self {
            Self::Year => NaiveDate::from_ymd_opt(d.year(), 1, 1)?.and_hms_opt(0, 0, 0),
            Self::Month => {
                NaiveDate::from_ymd_opt(d.year(), d.month(), 1)?.and_hms_opt(0, 0, 0)
            }
            Self::Day => d.and_hms_opt(0, 0, 0),
            Self::Hour => d.and_hms_opt(t.hour(), 0, 0),
            Self::Minute => d.and_hms_opt(t.hour(), t.minute(), 0),
            Self::Second => d.and_hms_opt(t.hour(), t.minute(), t.second()),
        }
    }

    /// Start of the period containing `t`.
    ///
    /// When the period start falls in a repeated (fall-back) hour, the
    /// occurrence not after `t` is chosen.
    pub fn truncate<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> Result<DateTime<Tz>, RollingError> {
        let naive = self
            .truncate_naive(t.naive_local())
            .ok_or(RollingError::TimeOutOfRange)?;
        let tz = t.timezone();
        match tz.from_local_datetime(&naive) {
            LocalResult::Ambiguous(early, late) => Ok(if late <= *t { late } else { early }),
            _ => resolve_local(&tz, naive),
        }
    }

    /// Start of the first period strictly after `now`.
    pub fn next_boundary<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, RollingError> {
        let start = self.truncate(now)?;
        let mut next = self.shift(&start, 1)?;
        while next <= *now {
            next = self.shift(&next, 1)?;
        }
        Ok(next)
    }

    /// Start of the period `periods` away from the one containing `from`
    /// (negative moves backwards).
    ///
    /// Calendar periods step from the wall-clock period start, so a day
    /// that began late because of a DST gap still rolls at the next midnight.
    pub fn shift<Tz: TimeZone>(
        &self,
        from: &DateTime<Tz>,
        periods: i64,
    ) -> Result<DateTime<Tz>, RollingError> {
        if periods == 0 {
            return Ok(from.clone());
        }

        if let Some(secs) = self.fixed_secs() {
            let delta = secs
                .checked_mul(periods)
                .and_then(TimeDelta::try_seconds)
                .ok_or(RollingError::TimeOutOfRange)?;
            return from
                .clone()
                .checked_add_signed(delta)
                .ok_or(RollingError::TimeOutOfRange);
        }

        let naive = self
            .truncate_naive(from.naive_local())
            .ok_or(RollingError::TimeOutOfRange)?;
        let count =
            u32::try_from(periods.unsigned_abs()).map_err(|_| RollingError::TimeOutOfRange)?;
        let moved = match (self, periods > 0) {
            (Self::Year, forward) => {
                let months = count
                    .checked_mul(12)
                    .map(Months::new)
                    .ok_or(RollingError::TimeOutOfRange)?;
                if forward {
                    naive.checked_add_months(months)
                } else {
                    naive.checked_sub_months(months)
                }
            }
            (Self::Month, true) => naive.checked_add_months(Months::new(count)),
            (Self::Month, false) => naive.checked_sub_months(Months::new(count)),
            (Self::Day, true) => naive.checked_add_days(Days::new(u64::from(count))),
            (Self::Day, false) => naive.checked_sub_days(Days::new(u64::from(count))),
            (Self::Hour | Self::Minute | Self::Second, _) => None,
        }
        .ok_or(RollingError::TimeOutOfRange)?;

        resolve_local(&from.timezone(), moved)
    }
}

/// Map a wall-clock time onto `tz`.
///
/// Ambiguous times take the earlier instant; times inside a DST gap move
/// forward to the instant the gap ends.
pub(crate) fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
) -> Result<DateTime<Tz>, RollingError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t),
        LocalResult::Ambiguous(early, _) => Ok(early),
        LocalResult::None => after_gap(tz, naive),
    }
}

/// First instant whose wall time lies after `naive`, which is skipped.
///
/// Binary search in UTC over the day either side; wall time only moves
/// forward across a gap.
fn after_gap<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, RollingError> {
    const WINDOW_SECS: i64 = 86_400;

    let utc_at = |secs: i64| {
        TimeDelta::try_seconds(secs - WINDOW_SECS).and_then(|d| naive.checked_add_signed(d))
    };
    let wall_is_after = |secs: i64| -> Result<bool, RollingError> {
        let utc = utc_at(secs).ok_or(RollingError::TimeOutOfRange)?;
        let offset = tz.offset_from_utc_datetime(&utc).fix().local_minus_utc();
        let wall = TimeDelta::try_seconds(i64::from(offset))
            .and_then(|d| utc.checked_add_signed(d))
            .ok_or(RollingError::TimeOutOfRange)?;
        Ok(wall > naive)
    };

    let (mut lo, mut hi) = (0, 2 * WINDOW_SECS);
    if wall_is_after(lo)? || !wall_is_after(hi)? {
        return Err(RollingError::TimeOutOfRange);
    }
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if wall_is_after(mid)? {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let utc = utc_at(hi).ok_or(RollingError::TimeOutOfRange)?;
    Ok(tz.from_utc_datetime(&utc))
}

impl fmt::Display for RollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollPeriod {
    type Err = RollingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEAR" => Ok(Self::Year),
            "MONTH" => Ok(Self::Month),
            "DAY" => Ok(Self::Day),
            "HOUR" => Ok(Self::Hour),
            "MINUTE" => Ok(Self::Minute),
            "SECOND" => Ok(Self::Second),
            _ => Err(RollingError::UnsupportedPeriod(s.to_string())),
        }
    }
}

impl Serialize for RollPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RollPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}
